//! Store server - serves the engine over newline-delimited JSON on TCP.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::core::error::Result;
use crate::store::engine::StoreEngine;
use crate::store::protocol::{StoreRequest, StoreResponse};

pub struct StoreServer {
    listener: TcpListener,
    engine: Arc<StoreEngine>,
}

impl StoreServer {
    pub async fn bind(addr: &str, engine: Arc<StoreEngine>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("store listener: {}", listener.local_addr()?);
        Ok(Self { listener, engine })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. One task per connection; a connection may issue any
    /// number of request lines.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let engine = self.engine.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, engine).await {
                    tracing::debug!("store connection {} closed: {}", peer, e);
                }
            });
        }
    }
}

async fn serve_connection(stream: TcpStream, engine: Arc<StoreEngine>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let reader = BufReader::new(read_half);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<StoreRequest>(&line) {
            Ok(request) => apply(&engine, request),
            // Malformed lines get a reply; the connection stays open.
            Err(e) => StoreResponse::Error {
                message: format!("bad request: {e}"),
            },
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        write_half.write_all(out.as_bytes()).await?;
    }
    Ok(())
}

fn apply(engine: &StoreEngine, request: StoreRequest) -> StoreResponse {
    match request {
        StoreRequest::Put {
            namespace,
            key,
            value,
        } => {
            engine.put(&namespace, &key, value);
            StoreResponse::Ok
        }
        StoreRequest::Get { namespace, key } => match engine.get_entry(&namespace, &key) {
            Some((value, updated_at)) => StoreResponse::Found { value, updated_at },
            None => StoreResponse::NotFound,
        },
        StoreRequest::Delete { namespace, key } => StoreResponse::Deleted {
            existed: engine.delete(&namespace, &key),
        },
        StoreRequest::ListKeys { namespace } => StoreResponse::Keys {
            keys: engine.list_keys(&namespace),
        },
        StoreRequest::ListValues { namespace } => StoreResponse::Values {
            values: engine.list_values(&namespace),
        },
        StoreRequest::Reset { namespace } => {
            engine.reset(&namespace);
            StoreResponse::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    async fn spawn_server() -> (SocketAddr, Arc<StoreEngine>) {
        let engine = Arc::new(StoreEngine::new());
        let server = StoreServer::bind("127.0.0.1:0", engine.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        (addr, engine)
    }

    #[tokio::test]
    async fn serves_requests_over_one_connection() {
        let (addr, engine) = spawn_server().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let put = serde_json::to_string(&StoreRequest::Put {
            namespace: "tickers".into(),
            key: "binance".into(),
            value: json!(["BTC/USDT", "ETH/USDT"]),
        })
        .unwrap();
        write_half.write_all(format!("{put}\n").as_bytes()).await.unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        assert!(matches!(
            serde_json::from_str::<StoreResponse>(&reply).unwrap(),
            StoreResponse::Ok
        ));
        assert_eq!(engine.get("tickers", "binance"), Some(json!(["BTC/USDT", "ETH/USDT"])));

        let get = serde_json::to_string(&StoreRequest::Get {
            namespace: "tickers".into(),
            key: "binance".into(),
        })
        .unwrap();
        write_half.write_all(format!("{get}\n").as_bytes()).await.unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        match serde_json::from_str::<StoreResponse>(&reply).unwrap() {
            StoreResponse::Found { value, .. } => {
                assert_eq!(value, json!(["BTC/USDT", "ETH/USDT"]))
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_line_gets_error_reply_and_connection_survives() {
        let (addr, _engine) = spawn_server().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"{\"op\":\"explode\"}\n").await.unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        assert!(matches!(
            serde_json::from_str::<StoreResponse>(&reply).unwrap(),
            StoreResponse::Error { .. }
        ));

        // same connection still serves valid requests
        let get = serde_json::to_string(&StoreRequest::Get {
            namespace: "top".into(),
            key: "1".into(),
        })
        .unwrap();
        write_half.write_all(format!("{get}\n").as_bytes()).await.unwrap();
        let reply = lines.next_line().await.unwrap().unwrap();
        assert!(matches!(
            serde_json::from_str::<StoreResponse>(&reply).unwrap(),
            StoreResponse::NotFound
        ));
    }
}
