//! In-memory namespace engine behind the store server.
//!
//! `RwLock<HashMap<namespace, HashMap<key, entry>>>`. Per-key operations
//! take the lock briefly; `reset` clears a namespace atomically under the
//! write lock. Key order is map-native and carries no guarantee.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::core::error::Result;
use crate::core::traits::StateStore;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    updated_at: DateTime<Utc>,
}

/// The shared keyed store. Cheap to share via `Arc`.
#[derive(Default)]
pub struct StoreEngine {
    namespaces: RwLock<HashMap<String, HashMap<String, Entry>>>,
}

impl StoreEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-writer-wins overwrite; bumps the entry timestamp.
    pub fn put(&self, namespace: &str, key: &str, value: Value) {
        let mut guard = self.namespaces.write();
        guard.entry(namespace.to_string()).or_default().insert(
            key.to_string(),
            Entry {
                value,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.get_entry(namespace, key).map(|(v, _)| v)
    }

    pub fn get_entry(&self, namespace: &str, key: &str) -> Option<(Value, DateTime<Utc>)> {
        self.namespaces
            .read()
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .map(|e| (e.value.clone(), e.updated_at))
    }

    pub fn delete(&self, namespace: &str, key: &str) -> bool {
        self.namespaces
            .write()
            .get_mut(namespace)
            .and_then(|ns| ns.remove(key))
            .is_some()
    }

    pub fn list_keys(&self, namespace: &str) -> Vec<String> {
        self.namespaces
            .read()
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn list_values(&self, namespace: &str) -> Vec<Value> {
        self.namespaces
            .read()
            .get(namespace)
            .map(|ns| ns.values().map(|e| e.value.clone()).collect())
            .unwrap_or_default()
    }

    /// Atomic clear of one namespace.
    pub fn reset(&self, namespace: &str) {
        self.namespaces.write().remove(namespace);
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }
}

#[async_trait]
impl StateStore for StoreEngine {
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        StoreEngine::put(self, namespace, key, value);
        Ok(())
    }

    async fn get_entry(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<(Value, DateTime<Utc>)>> {
        Ok(StoreEngine::get_entry(self, namespace, key))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        Ok(StoreEngine::delete(self, namespace, key))
    }

    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(StoreEngine::list_keys(self, namespace))
    }

    async fn list_values(&self, namespace: &str) -> Result<Vec<Value>> {
        Ok(StoreEngine::list_values(self, namespace))
    }

    async fn reset(&self, namespace: &str) -> Result<()> {
        StoreEngine::reset(self, namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwritten_key_has_no_phantom_default() {
        let engine = StoreEngine::new();
        assert!(engine.get("top", "41").is_none());
        assert!(engine.list_keys("top").is_empty());
    }

    #[test]
    fn put_get_round_trip_all_value_shapes() {
        let engine = StoreEngine::new();
        let cases = vec![
            json!("BTC/USDT"),
            json!(3.14),
            json!(true),
            json!(["a", "b", "c"]),
        ];
        for (i, v) in cases.iter().enumerate() {
            let key = format!("k{i}");
            engine.put("misc", &key, v.clone());
            assert_eq!(engine.get("misc", &key).as_ref(), Some(v));
        }
    }

    #[test]
    fn overwrite_is_last_writer_wins_and_bumps_timestamp() {
        let engine = StoreEngine::new();
        engine.put("trade_status", "hb", json!(1.0));
        let (_, first) = engine.get_entry("trade_status", "hb").unwrap();
        engine.put("trade_status", "hb", json!(2.0));
        let (v, second) = engine.get_entry("trade_status", "hb").unwrap();
        assert_eq!(v, json!(2.0));
        assert!(second >= first);
        assert_eq!(engine.list_keys("trade_status").len(), 1);
    }

    #[test]
    fn reset_clears_whole_namespace() {
        let engine = StoreEngine::new();
        engine.put("tickers", "binance", json!(["BTC/USDT"]));
        engine.put("tickers", "okx", json!(["ETH/USDT"]));
        engine.put("top", "1", json!({"worker_id": 1}));
        engine.reset("tickers");
        assert!(engine.get("tickers", "binance").is_none());
        assert!(engine.get("tickers", "okx").is_none());
        assert!(engine.list_keys("tickers").is_empty());
        // other namespaces untouched
        assert!(engine.get("top", "1").is_some());
    }

    #[test]
    fn trade_status_scenario() {
        let engine = StoreEngine::new();
        engine.put("trade_status", "test1", json!(3.14));
        engine.put("trade_status", "test2", json!(2.71));

        let keys: std::collections::HashSet<_> =
            engine.list_keys("trade_status").into_iter().collect();
        assert_eq!(
            keys,
            ["test1".to_string(), "test2".to_string()].into_iter().collect()
        );

        let values: Vec<f64> = engine
            .list_values("trade_status")
            .into_iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert!(values.contains(&3.14));
        assert!(values.contains(&2.71));
    }

    #[test]
    fn delete_removes_single_key() {
        let engine = StoreEngine::new();
        engine.put("crawl_targets", "anothernetwork", json!(["Snowden"]));
        assert!(engine.delete("crawl_targets", "anothernetwork"));
        assert!(!engine.delete("crawl_targets", "anothernetwork"));
        assert!(engine.get("crawl_targets", "anothernetwork").is_none());
    }
}
