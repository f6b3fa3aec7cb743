//! Control client - one envelope, one reply, one TCP round trip.
//!
//! A worker's endpoint is `bind_host : base_port + worker_id`. Connection
//! refused surfaces as `ServiceUnavailable`; error replies are rehydrated
//! into the typed taxonomy. The client never retries on its own; callers
//! own retry policy, and worker-side idempotence makes retrying
//! `start`/`stop` after an ambiguous timeout safe.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::core::config::ControlConfig;
use crate::core::error::{Error, Result};
use crate::core::types::{WorkerId, WorkerStatus};
use crate::rpc::protocol::{CommandEnvelope, CommandReply, CommandVerb, ErrorKind};

#[derive(Debug, Clone)]
pub struct ControlClient {
    bind_host: String,
    base_port: u16,
    call_timeout: Duration,
}

impl ControlClient {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            bind_host: config.bind_host.clone(),
            base_port: config.base_port,
            call_timeout: Duration::from_millis(config.call_timeout_ms),
        }
    }

    /// Deterministic endpoint for a worker id.
    pub fn worker_addr(&self, id: WorkerId) -> String {
        format!("{}:{}", self.bind_host, self.base_port as u32 + id.get())
    }

    pub async fn call_at(&self, addr: &str, envelope: &CommandEnvelope) -> Result<CommandReply> {
        let fut = async {
            let mut stream = TcpStream::connect(addr).await.map_err(|e| {
                Error::ServiceUnavailable(format!("worker {} at {addr}: {e}", envelope.target))
            })?;
            let mut line = serde_json::to_string(envelope)?;
            line.push('\n');
            stream.write_all(line.as_bytes()).await?;

            let mut reader = BufReader::new(stream);
            let mut reply = String::new();
            let n = reader.read_line(&mut reply).await?;
            if n == 0 {
                return Err(Error::ServiceUnavailable(format!(
                    "worker {} closed the connection",
                    envelope.target
                )));
            }
            Ok(serde_json::from_str::<CommandReply>(reply.trim())?)
        };
        let reply = match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout(self.call_timeout)),
        };
        match reply {
            CommandReply::Error { error, message } => Err(rehydrate(error, message, envelope)),
            reply => Ok(reply),
        }
    }

    pub async fn call(&self, envelope: &CommandEnvelope) -> Result<CommandReply> {
        self.call_at(&self.worker_addr(envelope.target), envelope)
            .await
    }

    pub async fn ping(&self, id: WorkerId) -> Result<bool> {
        self.ping_at(&self.worker_addr(id), id).await
    }

    pub async fn ping_at(&self, addr: &str, id: WorkerId) -> Result<bool> {
        self.expect_ack(addr, CommandEnvelope::new(id, CommandVerb::Ping))
            .await
    }

    pub async fn start(&self, id: WorkerId) -> Result<bool> {
        self.start_at(&self.worker_addr(id), id).await
    }

    pub async fn start_at(&self, addr: &str, id: WorkerId) -> Result<bool> {
        self.expect_ack(addr, CommandEnvelope::new(id, CommandVerb::Start))
            .await
    }

    pub async fn stop(&self, id: WorkerId) -> Result<bool> {
        self.stop_at(&self.worker_addr(id), id).await
    }

    pub async fn stop_at(&self, addr: &str, id: WorkerId) -> Result<bool> {
        self.expect_ack(addr, CommandEnvelope::new(id, CommandVerb::Stop))
            .await
    }

    pub async fn reload(&self, id: WorkerId) -> Result<bool> {
        self.expect_ack(
            &self.worker_addr(id),
            CommandEnvelope::new(id, CommandVerb::Reload),
        )
        .await
    }

    pub async fn dry_reset(&self, id: WorkerId) -> Result<bool> {
        self.expect_ack(
            &self.worker_addr(id),
            CommandEnvelope::new(id, CommandVerb::DryReset),
        )
        .await
    }

    pub async fn status(&self, id: WorkerId) -> Result<WorkerStatus> {
        self.status_at(&self.worker_addr(id), id).await
    }

    pub async fn status_at(&self, addr: &str, id: WorkerId) -> Result<WorkerStatus> {
        let envelope = CommandEnvelope::new(id, CommandVerb::Status);
        match self.call_at(addr, &envelope).await? {
            CommandReply::State { status } => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    /// Ask one worker for the fleet registry it knows.
    pub async fn list(&self, via: WorkerId) -> Result<Vec<WorkerId>> {
        let envelope = CommandEnvelope::new(via, CommandVerb::List);
        match self.call(&envelope).await? {
            CommandReply::Workers { ids } => Ok(ids),
            other => Err(unexpected(other)),
        }
    }

    async fn expect_ack(&self, addr: &str, envelope: CommandEnvelope) -> Result<bool> {
        match self.call_at(addr, &envelope).await? {
            CommandReply::Ack { ok } => Ok(ok),
            other => Err(unexpected(other)),
        }
    }
}

fn rehydrate(error: ErrorKind, message: String, envelope: &CommandEnvelope) -> Error {
    match error {
        ErrorKind::UnknownWorker => Error::UnknownWorker(envelope.target),
        ErrorKind::UnsupportedCommand => Error::UnsupportedCommand(message),
        ErrorKind::ServiceUnavailable => Error::ServiceUnavailable(message),
        ErrorKind::DataIntegrity => Error::DataIntegrity(message),
    }
}

fn unexpected(reply: CommandReply) -> Error {
    Error::DataIntegrity(format!("unexpected control reply: {reply:?}"))
}
