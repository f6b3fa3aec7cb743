//! Core traits - Seams between the control plane and its collaborators

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::error::Result;

/// Keyed store partitioned by namespace, last-writer-wins per key.
///
/// Implemented in-process by the store engine and over the wire by the
/// store client; managers only ever see this trait. Implementations must
/// not cache reads across calls: every read reflects current external
/// state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Idempotent overwrite; fails only when the store is unavailable.
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()>;

    /// Point read with the write timestamp; `None` when the key was never
    /// written (no phantom defaults).
    async fn get_entry(&self, namespace: &str, key: &str)
    -> Result<Option<(Value, DateTime<Utc>)>>;

    /// Point read of the bare value.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.get_entry(namespace, key).await?.map(|(v, _)| v))
    }

    /// Remove one key; returns whether it existed.
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool>;

    /// All current keys in a namespace. Store-native order, not sorted.
    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>>;

    /// All current values in a namespace.
    async fn list_values(&self, namespace: &str) -> Result<Vec<Value>>;

    /// Clear an entire namespace. The only operation requiring exclusivity
    /// with concurrent writers.
    async fn reset(&self, namespace: &str) -> Result<()>;
}
