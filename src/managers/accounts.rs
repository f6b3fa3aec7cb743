//! Balances published by workers.

use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::core::types::{Balance, WorkerId};
use crate::store::ns;

pub struct AccountManager {
    store: Arc<dyn StateStore>,
}

impl AccountManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Balances last published by one worker. Malformed rows surface as
    /// `DataIntegrity`, never as a silently empty list.
    pub async fn get_balances(&self, worker: WorkerId) -> Result<Vec<Balance>> {
        match self.store.get(ns::ACCOUNTS, &worker.to_string()).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| Error::DataIntegrity(format!("balances for worker {worker}: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    /// Workers that have published balances at least once.
    pub async fn list_funded_workers(&self) -> Result<Vec<WorkerId>> {
        let keys = self.store.list_keys(ns::ACCOUNTS).await?;
        keys.iter()
            .map(|k| {
                k.parse().map_err(|_| {
                    Error::DataIntegrity(format!("accounts namespace holds non-worker key '{k}'"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::engine::StoreEngine;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[tokio::test]
    async fn balances_decode_into_records() {
        let store = Arc::new(StoreEngine::new());
        store.put(
            "accounts",
            "4",
            json!([{"asset": "USDT", "free": 9_900.0, "locked": 100.0}]),
        );
        let accounts = AccountManager::new(store);
        let balances = accounts
            .get_balances(WorkerId::new(4).unwrap())
            .await
            .unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].total(), Decimal::from(10_000));
        assert_eq!(
            accounts.list_funded_workers().await.unwrap(),
            vec![WorkerId::new(4).unwrap()]
        );
    }

    #[tokio::test]
    async fn malformed_balance_row_surfaces_not_coerces() {
        let store = Arc::new(StoreEngine::new());
        store.put("accounts", "2", json!({"asset": "USDT"}));
        let accounts = AccountManager::new(store);
        assert!(matches!(
            accounts.get_balances(WorkerId::new(2).unwrap()).await,
            Err(Error::DataIntegrity(_))
        ));
    }
}
