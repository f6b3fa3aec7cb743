//! Store wire protocol - one JSON line per request, one per reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreRequest {
    Put {
        namespace: String,
        key: String,
        value: Value,
    },
    Get {
        namespace: String,
        key: String,
    },
    Delete {
        namespace: String,
        key: String,
    },
    ListKeys {
        namespace: String,
    },
    ListValues {
        namespace: String,
    },
    Reset {
        namespace: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreResponse {
    Ok,
    Found {
        value: Value,
        updated_at: DateTime<Utc>,
    },
    NotFound,
    Deleted {
        existed: bool,
    },
    Keys {
        keys: Vec<String>,
    },
    Values {
        values: Vec<Value>,
    },
    Error {
        message: String,
    },
}
