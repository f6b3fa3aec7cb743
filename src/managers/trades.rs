//! Float-valued trade status: liveness and heartbeat-style signalling.

use std::sync::Arc;

use serde_json::json;

use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::core::types::TradeStatusEntry;
use crate::store::ns;

pub struct TradeManager {
    store: Arc<dyn StateStore>,
}

impl TradeManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Point read. A stored non-numeric value is a data-integrity failure,
    /// never a silent coercion.
    pub async fn get_status(&self, key: &str) -> Result<Option<TradeStatusEntry>> {
        match self.store.get_entry(ns::TRADE_STATUS, key).await? {
            Some((value, updated_at)) => {
                let value = value.as_f64().ok_or_else(|| {
                    Error::DataIntegrity(format!("trade status '{key}' is not numeric: {value}"))
                })?;
                Ok(Some(TradeStatusEntry {
                    key: key.to_string(),
                    value,
                    updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn set_status(&self, key: &str, value: f64) -> Result<()> {
        self.store.put(ns::TRADE_STATUS, key, json!(value)).await
    }

    pub async fn list_status_keys(&self) -> Result<Vec<String>> {
        self.store.list_keys(ns::TRADE_STATUS).await
    }

    /// Every current value. One non-numeric entry fails the whole call:
    /// a partial list would be indistinguishable from a complete one.
    pub async fn list_status_values(&self) -> Result<Vec<f64>> {
        let values = self.store.list_values(ns::TRADE_STATUS).await?;
        values
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| {
                    Error::DataIntegrity(format!("non-numeric trade status value: {v}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::engine::StoreEngine;
    use std::collections::HashSet;

    #[tokio::test]
    async fn two_key_scenario() {
        let store = Arc::new(StoreEngine::new());
        let trades = TradeManager::new(store);
        trades.set_status("test1", 3.14).await.unwrap();
        trades.set_status("test2", 2.71).await.unwrap();

        let keys: HashSet<String> = trades.list_status_keys().await.unwrap().into_iter().collect();
        assert_eq!(
            keys,
            ["test1".to_string(), "test2".to_string()].into_iter().collect()
        );

        let values = trades.list_status_values().await.unwrap();
        assert!(values.contains(&3.14));
        assert!(values.contains(&2.71));

        let entry = trades.get_status("test1").await.unwrap().unwrap();
        assert_eq!(entry.value, 3.14);
        assert!(trades.get_status("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_numeric_value_fails_typed() {
        let store = Arc::new(StoreEngine::new());
        store.put("trade_status", "poison", serde_json::json!("not-a-float"));
        let trades = TradeManager::new(store);
        assert!(matches!(
            trades.get_status("poison").await,
            Err(Error::DataIntegrity(_))
        ));
        assert!(matches!(
            trades.list_status_values().await,
            Err(Error::DataIntegrity(_))
        ));
    }
}
