//! Fleet-wide process view: the `top` aggregation.

use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::core::types::{TopSnapshot, WorkerId};
use crate::store::ns;

pub struct ProcessManager {
    store: Arc<dyn StateStore>,
}

impl ProcessManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Every worker's snapshot row, `params` stripped, ordered by worker
    /// id. One undecodable row fails the whole call: a partial aggregate
    /// must never look like a complete one.
    pub async fn get_top(&self) -> Result<Vec<TopSnapshot>> {
        let values = self.store.list_values(ns::TOP).await?;
        let mut rows = Vec::with_capacity(values.len());
        for value in values {
            let snapshot: TopSnapshot = serde_json::from_value(value)
                .map_err(|e| Error::DataIntegrity(format!("top row: {e}")))?;
            rows.push(snapshot.redacted());
        }
        rows.sort_by_key(|row| row.worker_id);
        Ok(rows)
    }

    /// One worker's snapshot row, `params` stripped.
    pub async fn get_worker(&self, id: WorkerId) -> Result<Option<TopSnapshot>> {
        match self.store.get(ns::TOP, &id.to_string()).await? {
            Some(value) => {
                let snapshot: TopSnapshot = serde_json::from_value(value)
                    .map_err(|e| Error::DataIntegrity(format!("top row for {id}: {e}")))?;
                Ok(Some(snapshot.redacted()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::engine::StoreEngine;
    use serde_json::json;

    fn top_row(id: u32, with_params: bool) -> serde_json::Value {
        let mut row = json!({
            "worker_id": id,
            "pid": 1000 + id,
            "status": "running",
            "strategy": "grid",
            "uptime_secs": 12,
            "dry_run": false,
            "heartbeat_at": "2026-08-01T00:00:00Z",
        });
        if with_params {
            row["params"] = json!({"api_key": "sk-secret"});
        }
        row
    }

    #[tokio::test]
    async fn get_top_strips_params_and_orders_by_id() {
        let store = Arc::new(StoreEngine::new());
        store.put("top", "2", top_row(2, true));
        store.put("top", "1", top_row(1, false));
        let process = ProcessManager::new(store);

        let rows = process.get_top().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].worker_id.get(), 1);
        assert_eq!(rows[1].worker_id.get(), 2);
        assert!(rows.iter().all(|r| r.params.is_none()));
    }

    #[tokio::test]
    async fn one_broken_row_fails_the_whole_aggregate() {
        let store = Arc::new(StoreEngine::new());
        store.put("top", "1", top_row(1, false));
        store.put("top", "9", json!({"worker_id": "not-an-id"}));
        let process = ProcessManager::new(store);
        assert!(matches!(
            process.get_top().await,
            Err(Error::DataIntegrity(_))
        ));
    }

    #[tokio::test]
    async fn point_read_redacts_too() {
        let store = Arc::new(StoreEngine::new());
        store.put("top", "2", top_row(2, true));
        let process = ProcessManager::new(store);
        let row = process
            .get_worker(WorkerId::new(2).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(row.params.is_none());
        assert!(
            process
                .get_worker(WorkerId::new(3).unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }
}
