//! Per-worker control endpoint.
//!
//! Same accept-loop shape as the store server: one task per connection,
//! one reply line per request line. Lifecycle verbs are forwarded into the
//! worker's command channel; read verbs answer from shared state directly.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::core::error::{Error, Result};
use crate::core::types::WorkerId;
use crate::rpc::protocol::{CommandEnvelope, CommandReply, CommandVerb};
use crate::worker::bot::{BotWorker, WorkerCommand};

struct Shared {
    worker: Arc<BotWorker>,
    commands: flume::Sender<WorkerCommand>,
    known: Vec<WorkerId>,
}

pub struct ControlServer {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl ControlServer {
    pub async fn bind(
        addr: &str,
        worker: Arc<BotWorker>,
        commands: flume::Sender<WorkerCommand>,
        known: Vec<WorkerId>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            "control listener for worker {}: {}",
            worker.id(),
            listener.local_addr()?
        );
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                worker,
                commands,
                known,
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let shared = self.shared.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, shared).await {
                    tracing::debug!("control connection {} closed: {}", peer, e);
                }
            });
        }
    }
}

async fn serve_connection(stream: TcpStream, shared: Arc<Shared>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let reader = BufReader::new(read_half);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match CommandEnvelope::decode(&line) {
            Ok(envelope) => handle(&shared, envelope).await,
            Err(e) => CommandReply::from_error(&e),
        };
        let mut out = serde_json::to_string(&reply)?;
        out.push('\n');
        write_half.write_all(out.as_bytes()).await?;
    }
    Ok(())
}

async fn handle(shared: &Shared, envelope: CommandEnvelope) -> CommandReply {
    if envelope.target != shared.worker.id() {
        return CommandReply::from_error(&Error::UnknownWorker(envelope.target));
    }

    match envelope.verb {
        CommandVerb::Ping => CommandReply::Ack { ok: true },
        CommandVerb::Status => CommandReply::State {
            status: shared.worker.status(),
        },
        CommandVerb::List => CommandReply::Workers {
            ids: shared.known.clone(),
        },
        CommandVerb::Start => lifecycle(shared, WorkerCommand::Start).await,
        CommandVerb::Stop => lifecycle(shared, WorkerCommand::Stop).await,
        CommandVerb::Reload => lifecycle(shared, WorkerCommand::Reload).await,
        CommandVerb::DryReset => lifecycle(shared, WorkerCommand::DryReset).await,
    }
}

async fn lifecycle(
    shared: &Shared,
    make: impl FnOnce(oneshot::Sender<bool>) -> WorkerCommand,
) -> CommandReply {
    let (tx, rx) = oneshot::channel();
    if shared.commands.send_async(make(tx)).await.is_err() {
        return CommandReply::from_error(&Error::ServiceUnavailable(
            "worker lifecycle task is gone".into(),
        ));
    }
    match rx.await {
        Ok(ok) => CommandReply::Ack { ok },
        Err(_) => CommandReply::from_error(&Error::ServiceUnavailable(
            "worker lifecycle task dropped the reply".into(),
        )),
    }
}
