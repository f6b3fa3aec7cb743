//! Candle-stream subscriptions per exchange.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::core::types::Symbol;
use crate::store::ns;

/// One candle stream a worker keeps warm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcvSubscription {
    pub symbol: Symbol,
    pub timeframe: String,
}

pub struct OhlcvManager {
    store: Arc<dyn StateStore>,
}

impl OhlcvManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn get_subscriptions(&self, exchange: &str) -> Result<Vec<OhlcvSubscription>> {
        match self.store.get(ns::OHLCV, exchange).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                Error::DataIntegrity(format!("ohlcv subscriptions for {exchange}: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }

    pub async fn set_subscriptions(
        &self,
        exchange: &str,
        subscriptions: &[OhlcvSubscription],
    ) -> Result<()> {
        self.store
            .put(ns::OHLCV, exchange, serde_json::to_value(subscriptions)?)
            .await
    }

    /// Exchanges with at least one live candle subscription.
    pub async fn list_feeds(&self) -> Result<Vec<String>> {
        self.store.list_keys(ns::OHLCV).await
    }
}
