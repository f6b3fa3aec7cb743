//! Record types - Strong typing at the cache/RPC boundary
//!
//! Everything here serializes as a flat field map. Decoding ignores unknown
//! fields so old readers survive newer writers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::error::{Error, Result};

/// Opaque positive integer identifying one bot process. Assigned at
/// bot-creation time, immutable for the life of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct WorkerId(u32);

impl WorkerId {
    pub fn new(raw: u32) -> Result<Self> {
        if raw == 0 {
            return Err(Error::Config("worker id must be a positive integer".into()));
        }
        Ok(Self(raw))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for WorkerId {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<WorkerId> for u32 {
    fn from(id: WorkerId) -> u32 {
        id.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WorkerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: u32 = s
            .parse()
            .map_err(|_| Error::Config(format!("invalid worker id '{s}'")))?;
        Self::new(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Open,
    Filled,
    Cancelled,
}

/// Worker lifecycle states.
///
/// `created → running → stopping → stopped`; `stopped` is terminal until an
/// external restart re-enters `created`. Dry-run toggles independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerStatus::Created => "created",
            WorkerStatus::Running => "running",
            WorkerStatus::Stopping => "stopping",
            WorkerStatus::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a validated order. Impossible combinations are rejected here,
    /// not at use sites.
    pub fn new(
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> Result<Self> {
        if quantity <= Decimal::ZERO {
            return Err(Error::DataIntegrity(format!(
                "order quantity must be positive, got {quantity}"
            )));
        }
        if let Some(p) = price {
            if p <= Decimal::ZERO {
                return Err(Error::DataIntegrity(format!(
                    "order price must be positive, got {p}"
                )));
            }
        }
        if order_type == OrderType::Limit && price.is_none() {
            return Err(Error::DataIntegrity("limit order requires a price".into()));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            symbol,
            side,
            order_type,
            quantity,
            price,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub order_id: Uuid,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    pub fn new(
        order_id: Uuid,
        symbol: Symbol,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
    ) -> Result<Self> {
        if quantity <= Decimal::ZERO {
            return Err(Error::DataIntegrity(format!(
                "trade quantity must be positive, got {quantity}"
            )));
        }
        if price <= Decimal::ZERO {
            return Err(Error::DataIntegrity(format!(
                "trade price must be positive, got {price}"
            )));
        }
        if fee < Decimal::ZERO {
            return Err(Error::DataIntegrity(format!(
                "trade fee cannot be negative, got {fee}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            symbol,
            side,
            quantity,
            price,
            fee,
            executed_at: Utc::now(),
        })
    }

    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub side: Side,
    pub volume: Decimal,
    pub entry_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn new(symbol: Symbol, side: Side, volume: Decimal, entry_price: Decimal) -> Result<Self> {
        if volume < Decimal::ZERO {
            return Err(Error::DataIntegrity(format!(
                "position volume cannot be negative, got {volume}"
            )));
        }
        if entry_price <= Decimal::ZERO {
            return Err(Error::DataIntegrity(format!(
                "position entry price must be positive, got {entry_price}"
            )));
        }
        Ok(Self {
            symbol,
            side,
            volume,
            entry_price,
            opened_at: Utc::now(),
        })
    }
}

/// Account balance as published by workers into the `accounts` namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// Strategy reference carried by a worker. The control plane only names
/// strategies; it never executes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// A content source a crawler worker should poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlerProfile {
    pub site: String,
    pub account: String,
}

/// One published fact, keyed within a domain namespace. Within one
/// namespace the key is unique: a later write overwrites the prior value
/// and bumps `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub worker_id: WorkerId,
    pub key: String,
    pub value: Value,
    pub updated_at: DateTime<Utc>,
}

/// Float-valued status entry used for liveness/heartbeat signalling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeStatusEntry {
    pub key: String,
    pub value: f64,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated per-worker summary row published under the `top` namespace.
///
/// `params` is internal/sensitive and MUST be stripped before a snapshot
/// leaves the control plane; see [`TopSnapshot::redacted`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopSnapshot {
    pub worker_id: WorkerId,
    pub pid: u32,
    pub status: WorkerStatus,
    pub strategy: String,
    pub uptime_secs: u64,
    pub dry_run: bool,
    pub heartbeat_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl TopSnapshot {
    /// The only form a manager may hand to a control client.
    pub fn redacted(mut self) -> Self {
        self.params = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn worker_id_rejects_zero() {
        assert!(WorkerId::new(0).is_err());
        assert!(WorkerId::new(1).is_ok());
        assert!(serde_json::from_str::<WorkerId>("0").is_err());
        let id: WorkerId = serde_json::from_str("7").unwrap();
        assert_eq!(id.get(), 7);
    }

    #[test]
    fn order_rejects_impossible_combinations() {
        let sym = Symbol::new("BTC/USDT");
        assert!(
            Order::new(sym.clone(), Side::Buy, OrderType::Market, Decimal::from(-1), None).is_err()
        );
        assert!(Order::new(sym.clone(), Side::Buy, OrderType::Limit, Decimal::ONE, None).is_err());
        let ok = Order::new(
            sym,
            Side::Buy,
            OrderType::Limit,
            Decimal::ONE,
            Some(Decimal::from(30_000)),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn position_rejects_negative_volume() {
        let bad = Position::new(
            Symbol::new("ETH/USDT"),
            Side::Buy,
            Decimal::from(-3),
            Decimal::from(2000),
        );
        assert!(matches!(bad, Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn snapshot_redaction_strips_params() {
        let mut params = Map::new();
        params.insert("api_key".into(), Value::String("sk-secret".into()));
        let snap = TopSnapshot {
            worker_id: WorkerId::new(3).unwrap(),
            pid: 4242,
            status: WorkerStatus::Running,
            strategy: "grid".into(),
            uptime_secs: 60,
            dry_run: false,
            heartbeat_at: Utc::now(),
            params: Some(params),
        };
        let redacted = snap.redacted();
        assert!(redacted.params.is_none());
        let wire = serde_json::to_string(&redacted).unwrap();
        assert!(!wire.contains("params"));
        assert!(!wire.contains("sk-secret"));
    }

    #[test]
    fn records_ignore_unknown_fields() {
        let raw = r#"{
            "worker_id": 5, "pid": 100, "status": "running", "strategy": "scalp",
            "uptime_secs": 9, "dry_run": true, "heartbeat_at": "2026-08-01T00:00:00Z",
            "shard": "eu-west", "build": "abcdef"
        }"#;
        let snap: TopSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.worker_id.get(), 5);
        assert!(snap.params.is_none());
    }
}
