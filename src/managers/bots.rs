//! Imperative worker lifecycle, delegated to the control RPC.

use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::types::{WorkerId, WorkerStatus};
use crate::rpc::client::ControlClient;

pub struct BotManager {
    registry: Vec<WorkerId>,
    control: Arc<ControlClient>,
}

impl BotManager {
    pub fn new(registry: Vec<WorkerId>, control: Arc<ControlClient>) -> Self {
        Self { registry, control }
    }

    /// All known workers, regardless of state.
    pub fn list(&self) -> Vec<WorkerId> {
        self.registry.clone()
    }

    /// An id outside the registry is rejected before any network call,
    /// never a silent `false`.
    fn resolve(&self, id: WorkerId) -> Result<()> {
        if self.registry.contains(&id) {
            Ok(())
        } else {
            Err(Error::UnknownWorker(id))
        }
    }

    pub async fn start(&self, id: WorkerId) -> Result<bool> {
        self.resolve(id)?;
        self.control.start(id).await
    }

    pub async fn stop(&self, id: WorkerId) -> Result<bool> {
        self.resolve(id)?;
        self.control.stop(id).await
    }

    pub async fn ping(&self, id: WorkerId) -> Result<bool> {
        self.resolve(id)?;
        self.control.ping(id).await
    }

    pub async fn reload(&self, id: WorkerId) -> Result<bool> {
        self.resolve(id)?;
        self.control.reload(id).await
    }

    pub async fn dry_reset(&self, id: WorkerId) -> Result<bool> {
        self.resolve(id)?;
        self.control.dry_reset(id).await
    }

    pub async fn status(&self, id: WorkerId) -> Result<WorkerStatus> {
        self.resolve(id)?;
        self.control.status(id).await
    }

    /// Probe the whole registry concurrently. Unreachable workers come
    /// back `false`; this is a fleet sweep, not a single liveness check.
    pub async fn ping_all(&self) -> Vec<(WorkerId, bool)> {
        let probes = self.registry.iter().map(|&id| async move {
            let alive = self.control.ping(id).await.unwrap_or(false);
            (id, alive)
        });
        futures::future::join_all(probes).await
    }
}
