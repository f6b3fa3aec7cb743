//! Error handling - Typed, hierarchical errors for the control plane

use std::time::Duration;

use thiserror::Error;

use crate::core::types::WorkerId;

pub type Result<T> = std::result::Result<T, Error>;

/// HiveTX error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Store or control endpoint unreachable
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A remote call exceeded its deadline
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// Command referenced a worker id with no known process
    #[error("unknown worker {0}")]
    UnknownWorker(WorkerId),

    /// Verb not part of the control protocol
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    /// A stored or received value failed its expected-type decode
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// Network/IO errors
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Only transient unavailability may be retried locally; every other
    /// class surfaces to the caller immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ServiceUnavailable(_) | Error::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailability_is_retryable() {
        assert!(Error::ServiceUnavailable("down".into()).is_retryable());
        assert!(Error::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!Error::UnsupportedCommand("fly".into()).is_retryable());
        assert!(!Error::DataIntegrity("bad float".into()).is_retryable());
    }
}
