//! Shared State Store - process-external keyed cache for the fleet
//!
//! Workers publish status into it continuously; managers read it on demand.
//! One engine, two access paths: in-process (tests, the store server) and
//! over newline-delimited JSON on TCP (everything else).

pub mod client;
pub mod engine;
pub mod protocol;
pub mod server;

pub use client::StoreClient;
pub use engine::StoreEngine;
pub use server::StoreServer;

/// Namespace names of the fleet keyspace.
pub mod ns {
    /// key = exchange id → list of symbol identifiers
    pub const TICKERS: &str = "tickers";
    /// key = free-form status key → float
    pub const TRADE_STATUS: &str = "trade_status";
    /// key = site id → list of account identifiers
    pub const CRAWL_TARGETS: &str = "crawl_targets";
    /// key = worker id → per-worker snapshot record
    pub const TOP: &str = "top";
    /// key = exchange id → list of candle subscriptions
    pub const OHLCV: &str = "ohlcv";
    /// key = worker id → list of balances
    pub const ACCOUNTS: &str = "accounts";
}
