//! Ticker lists per exchange.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::core::types::Symbol;
use crate::store::ns;

pub struct TickManager {
    store: Arc<dyn StateStore>,
}

impl TickManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Symbols currently tracked on an exchange. An exchange nobody wrote
    /// is an empty list, not an error.
    pub async fn get_tickers(&self, exchange: &str) -> Result<Vec<Symbol>> {
        match self.store.get(ns::TICKERS, exchange).await? {
            Some(value) => decode_symbols(exchange, value),
            None => Ok(Vec::new()),
        }
    }

    /// Administrative overwrite of an exchange's ticker list.
    pub async fn set_tickers(&self, exchange: &str, symbols: &[Symbol]) -> Result<()> {
        let list: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        self.store.put(ns::TICKERS, exchange, json!(list)).await
    }

    pub async fn list_exchanges(&self) -> Result<Vec<String>> {
        self.store.list_keys(ns::TICKERS).await
    }
}

fn decode_symbols(exchange: &str, value: Value) -> Result<Vec<Symbol>> {
    let items = value.as_array().ok_or_else(|| {
        Error::DataIntegrity(format!("tickers for {exchange} is not a list"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(Symbol::new).ok_or_else(|| {
                Error::DataIntegrity(format!("non-string ticker entry for {exchange}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::engine::StoreEngine;

    #[tokio::test]
    async fn set_then_get_round_trips_symbols() {
        let store = Arc::new(StoreEngine::new());
        let ticks = TickManager::new(store);
        ticks
            .set_tickers("binance", &[Symbol::new("btc/usdt"), Symbol::new("ETH/USDT")])
            .await
            .unwrap();
        let symbols = ticks.get_tickers("binance").await.unwrap();
        assert_eq!(symbols, vec![Symbol::new("BTC/USDT"), Symbol::new("ETH/USDT")]);
        assert_eq!(ticks.list_exchanges().await.unwrap(), vec!["binance"]);
    }

    #[tokio::test]
    async fn malformed_ticker_list_is_a_data_integrity_failure() {
        let store = Arc::new(StoreEngine::new());
        store.put("tickers", "okx", serde_json::json!(42));
        let ticks = TickManager::new(store);
        assert!(matches!(
            ticks.get_tickers("okx").await,
            Err(Error::DataIntegrity(_))
        ));
    }
}
