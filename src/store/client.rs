//! Store client - one TCP round trip per operation.
//!
//! Every call carries its own deadline. Transient unavailability is retried
//! with bounded exponential backoff; every other failure surfaces
//! immediately. Nothing is cached between calls.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::core::config::StoreConfig;
use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::store::protocol::{StoreRequest, StoreResponse};

#[derive(Debug, Clone)]
pub struct StoreClient {
    addr: String,
    op_timeout: Duration,
    retry_attempts: u32,
    retry_base: Duration,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            addr: config.addr.clone(),
            op_timeout: Duration::from_millis(config.op_timeout_ms),
            retry_attempts: config.retry_attempts.max(1),
            retry_base: Duration::from_millis(config.retry_base_ms),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, request: &StoreRequest) -> Result<StoreResponse> {
        let mut attempt = 0u32;
        loop {
            match self.round_trip(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt + 1 < self.retry_attempts => {
                    let backoff =
                        self.retry_base.saturating_mul(2u32.saturating_pow(attempt)) + self.jitter();
                    tracing::warn!(
                        "store call failed ({}), retrying in {:?} ({}/{})",
                        e,
                        backoff,
                        attempt + 1,
                        self.retry_attempts
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn jitter(&self) -> Duration {
        let half = (self.retry_base.as_millis() as u64) / 2;
        Duration::from_millis(rand::rng().random_range(0..=half))
    }

    async fn round_trip(&self, request: &StoreRequest) -> Result<StoreResponse> {
        let fut = async {
            let mut stream = TcpStream::connect(&self.addr).await.map_err(|e| {
                Error::ServiceUnavailable(format!("store at {}: {e}", self.addr))
            })?;
            let mut line = serde_json::to_string(request)?;
            line.push('\n');
            stream.write_all(line.as_bytes()).await?;

            let mut reader = BufReader::new(stream);
            let mut reply = String::new();
            let n = reader.read_line(&mut reply).await?;
            if n == 0 {
                return Err(Error::ServiceUnavailable(
                    "store closed the connection".into(),
                ));
            }
            Ok(serde_json::from_str::<StoreResponse>(reply.trim())?)
        };
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => match result? {
                StoreResponse::Error { message } => Err(Error::DataIntegrity(format!(
                    "store rejected request: {message}"
                ))),
                response => Ok(response),
            },
            Err(_) => Err(Error::Timeout(self.op_timeout)),
        }
    }

    fn unexpected(response: StoreResponse) -> Error {
        Error::DataIntegrity(format!("unexpected store reply: {response:?}"))
    }
}

#[async_trait]
impl StateStore for StoreClient {
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        let request = StoreRequest::Put {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
        };
        match self.call(&request).await? {
            StoreResponse::Ok => Ok(()),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn get_entry(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<(Value, DateTime<Utc>)>> {
        let request = StoreRequest::Get {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        match self.call(&request).await? {
            StoreResponse::Found { value, updated_at } => Ok(Some((value, updated_at))),
            StoreResponse::NotFound => Ok(None),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let request = StoreRequest::Delete {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        match self.call(&request).await? {
            StoreResponse::Deleted { existed } => Ok(existed),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>> {
        let request = StoreRequest::ListKeys {
            namespace: namespace.to_string(),
        };
        match self.call(&request).await? {
            StoreResponse::Keys { keys } => Ok(keys),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn list_values(&self, namespace: &str) -> Result<Vec<Value>> {
        let request = StoreRequest::ListValues {
            namespace: namespace.to_string(),
        };
        match self.call(&request).await? {
            StoreResponse::Values { values } => Ok(values),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn reset(&self, namespace: &str) -> Result<()> {
        let request = StoreRequest::Reset {
            namespace: namespace.to_string(),
        };
        match self.call(&request).await? {
            StoreResponse::Ok => Ok(()),
            other => Err(Self::unexpected(other)),
        }
    }
}
