//! Heartbeat publisher - pushes worker status into the store on a fixed
//! interval. Store failures are logged and retried on the next beat.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::core::error::Result;
use crate::core::traits::StateStore;
use crate::store::ns;
use crate::worker::bot::BotWorker;

/// Runs until the process exits.
pub async fn run(worker: Arc<BotWorker>, store: Arc<dyn StateStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = publish(&worker, store.as_ref()).await {
            tracing::warn!("worker {} heartbeat publish failed: {}", worker.id(), e);
        }
    }
}

/// One publish cycle: the `top` row, the float liveness facts, and the
/// paper balances.
pub async fn publish(worker: &BotWorker, store: &dyn StateStore) -> Result<()> {
    let snapshot = worker.snapshot();
    let key = snapshot.worker_id.to_string();
    store
        .put(ns::TOP, &key, serde_json::to_value(&snapshot)?)
        .await?;

    for record in worker.status_records() {
        store
            .put(ns::TRADE_STATUS, &record.key, record.value.clone())
            .await?;
    }

    store
        .put(ns::ACCOUNTS, &key, serde_json::to_value(worker.balances())?)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WorkerSettings;
    use crate::core::types::{TopSnapshot, WorkerId, WorkerStatus};
    use crate::store::engine::StoreEngine;

    #[tokio::test]
    async fn publish_writes_top_row_and_liveness_floats() {
        let engine = Arc::new(StoreEngine::new());
        let worker = BotWorker::new(WorkerId::new(3).unwrap(), &WorkerSettings::default());
        worker.start();

        publish(&worker, engine.as_ref()).await.unwrap();

        let raw = engine.get(ns::TOP, "3").expect("top row written");
        let snap: TopSnapshot = serde_json::from_value(raw).unwrap();
        assert_eq!(snap.status, WorkerStatus::Running);
        assert!(snap.params.is_some(), "store holds the unredacted row");

        let hb = engine
            .get(ns::TRADE_STATUS, "worker_3_heartbeat")
            .expect("heartbeat fact written");
        assert!(hb.as_f64().is_some());
        assert!(engine.get(ns::ACCOUNTS, "3").is_some());
    }
}
