//! The bot worker: lifecycle state machine plus dry-run paper state.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use tokio::sync::oneshot;

use crate::core::config::{FleetConfig, WorkerSettings};
use crate::core::error::{Error, Result};
use crate::core::traits::StateStore;
use crate::core::types::{
    Balance, Order, Position, StatusRecord, StrategyInfo, TopSnapshot, Trade, WorkerId,
    WorkerStatus,
};
use crate::worker::heartbeat;

/// Lifecycle verbs forwarded from the RPC server. Each carries a reply
/// channel so the caller gets the transition outcome.
#[derive(Debug)]
pub enum WorkerCommand {
    Start(oneshot::Sender<bool>),
    Stop(oneshot::Sender<bool>),
    Reload(oneshot::Sender<bool>),
    DryReset(oneshot::Sender<bool>),
}

/// Simulated trading state, only meaningful while dry-run is on.
#[derive(Debug, Clone)]
pub struct PaperState {
    pub fills: u64,
    pub balances: Vec<Balance>,
    pub positions: Vec<Position>,
}

pub struct BotWorker {
    id: WorkerId,
    pid: u32,
    started_at: DateTime<Utc>,
    status: RwLock<WorkerStatus>,
    dry_run: AtomicBool,
    strategy: RwLock<StrategyInfo>,
    simul_mktfee: Decimal,
    paper_balance: Decimal,
    paper: RwLock<PaperState>,
}

impl BotWorker {
    pub fn new(id: WorkerId, settings: &WorkerSettings) -> Self {
        let paper_balance =
            Decimal::try_from(settings.paper_balance_usd).unwrap_or_default();
        let simul_mktfee = Decimal::try_from(settings.simul_mktfee).unwrap_or_default();
        Self {
            id,
            pid: std::process::id(),
            started_at: Utc::now(),
            status: RwLock::new(WorkerStatus::Created),
            dry_run: AtomicBool::new(settings.dry_run),
            strategy: RwLock::new(StrategyInfo {
                name: settings.strategy.clone(),
                enabled: true,
                params: settings.params.clone(),
            }),
            simul_mktfee,
            paper_balance,
            paper: RwLock::new(Self::fresh_paper(paper_balance)),
        }
    }

    fn fresh_paper(balance: Decimal) -> PaperState {
        PaperState {
            fills: 0,
            balances: vec![Balance {
                asset: "USDT".to_string(),
                free: balance,
                locked: Decimal::ZERO,
            }],
            positions: Vec::new(),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn status(&self) -> WorkerStatus {
        *self.status.read()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run.load(Ordering::Relaxed)
    }

    pub fn set_dry_run(&self, on: bool) {
        self.dry_run.store(on, Ordering::Relaxed);
    }

    pub fn paper(&self) -> PaperState {
        self.paper.read().clone()
    }

    pub fn balances(&self) -> Vec<Balance> {
        self.paper.read().balances.clone()
    }

    /// `created`/`stopped` → `running`. Already running counts as success;
    /// a worker mid-stop cannot be restarted until the stop completes.
    pub fn start(&self) -> bool {
        let mut status = self.status.write();
        match *status {
            WorkerStatus::Created | WorkerStatus::Stopped => {
                *status = WorkerStatus::Running;
                true
            }
            WorkerStatus::Running => true,
            WorkerStatus::Stopping => false,
        }
    }

    /// Any state → `stopped`. Idempotent: stopping an already-stopped
    /// worker is success. There are no in-flight orders to unwind in the
    /// control plane, so the `stopping` phase collapses immediately.
    pub fn stop(&self) -> bool {
        let mut status = self.status.write();
        *status = WorkerStatus::Stopped;
        true
    }

    /// Replace strategy params (from a re-read config).
    pub fn reload(&self, params: Map<String, Value>) -> bool {
        self.strategy.write().params = params;
        true
    }

    /// Wipe dry-run paper state back to the starting balance.
    pub fn dry_reset(&self) -> bool {
        *self.paper.write() = Self::fresh_paper(self.paper_balance);
        true
    }

    /// Fill an order against the paper book at its own price, charging the
    /// simulated market fee.
    pub fn simulate_fill(&self, order: &Order) -> Result<Trade> {
        if !self.dry_run() {
            return Err(Error::UnsupportedCommand(
                "simulated fills require dry-run mode".into(),
            ));
        }
        let price = order.price.ok_or_else(|| {
            Error::DataIntegrity("simulated fill requires a reference price".into())
        })?;
        let fee = order.quantity * price * self.simul_mktfee;
        let trade = Trade::new(
            order.id,
            order.symbol.clone(),
            order.side,
            order.quantity,
            price,
            fee,
        )?;
        self.apply_paper_fill(&trade)?;
        Ok(trade)
    }

    fn apply_paper_fill(&self, trade: &Trade) -> Result<()> {
        use crate::core::types::Side;

        let mut paper = self.paper.write();
        let delta = match trade.side {
            Side::Buy => -(trade.notional() + trade.fee),
            Side::Sell => trade.notional() - trade.fee,
        };

        let slot = paper
            .positions
            .iter()
            .position(|p| p.symbol == trade.symbol);
        match trade.side {
            Side::Buy => match slot {
                Some(i) => paper.positions[i].volume += trade.quantity,
                None => paper.positions.push(Position::new(
                    trade.symbol.clone(),
                    Side::Buy,
                    trade.quantity,
                    trade.price,
                )?),
            },
            Side::Sell => {
                let Some(i) = slot else {
                    return Err(Error::DataIntegrity(format!(
                        "sell {} without an open position",
                        trade.symbol
                    )));
                };
                if paper.positions[i].volume < trade.quantity {
                    return Err(Error::DataIntegrity(format!(
                        "sell {} exceeds open volume {}",
                        trade.quantity, paper.positions[i].volume
                    )));
                }
                paper.positions[i].volume -= trade.quantity;
                if paper.positions[i].volume == Decimal::ZERO {
                    paper.positions.remove(i);
                }
            }
        }

        if let Some(quote) = paper.balances.iter_mut().find(|b| b.asset == "USDT") {
            quote.free += delta;
        }
        paper.fills += 1;
        Ok(())
    }

    /// The row this worker publishes under the `top` namespace. Includes
    /// internal `params`; redaction happens at the manager boundary.
    pub fn snapshot(&self) -> TopSnapshot {
        let strategy = self.strategy.read();
        TopSnapshot {
            worker_id: self.id,
            pid: self.pid,
            status: self.status(),
            strategy: strategy.name.clone(),
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
            dry_run: self.dry_run(),
            heartbeat_at: Utc::now(),
            params: Some(strategy.params.clone()),
        }
    }

    /// Float-valued liveness facts published under `trade_status`.
    pub fn status_records(&self) -> Vec<StatusRecord> {
        let now = Utc::now();
        let paper = self.paper.read();
        vec![
            StatusRecord {
                worker_id: self.id,
                key: format!("worker_{}_heartbeat", self.id),
                value: json!(now.timestamp() as f64),
                updated_at: now,
            },
            StatusRecord {
                worker_id: self.id,
                key: format!("worker_{}_paper_fills", self.id),
                value: json!(paper.fills as f64),
                updated_at: now,
            },
        ]
    }
}

/// Serializes lifecycle transitions: one task applies commands in arrival
/// order and pushes the resulting status to the store right away, so a
/// successful transition is visible well within one heartbeat interval.
pub async fn run_lifecycle(
    worker: Arc<BotWorker>,
    store: Arc<dyn StateStore>,
    config_path: Option<PathBuf>,
    commands: flume::Receiver<WorkerCommand>,
) {
    while let Ok(command) = commands.recv_async().await {
        match command {
            WorkerCommand::Start(reply) => {
                let ok = worker.start();
                if ok {
                    tracing::info!("worker {} entered {}", worker.id(), worker.status());
                } else {
                    tracing::warn!("worker {} refused start while stopping", worker.id());
                }
                publish_now(&worker, store.as_ref()).await;
                let _ = reply.send(ok);
            }
            WorkerCommand::Stop(reply) => {
                let ok = worker.stop();
                tracing::info!("worker {} entered {}", worker.id(), worker.status());
                publish_now(&worker, store.as_ref()).await;
                let _ = reply.send(ok);
            }
            WorkerCommand::Reload(reply) => {
                let ok = match config_path.as_deref() {
                    Some(path) => match FleetConfig::load(path) {
                        Ok(config) => worker.reload(config.worker.params),
                        Err(e) => {
                            tracing::warn!("worker {} reload failed: {}", worker.id(), e);
                            false
                        }
                    },
                    // nothing to re-read; current params stand
                    None => true,
                };
                let _ = reply.send(ok);
            }
            WorkerCommand::DryReset(reply) => {
                let ok = worker.dry_reset();
                tracing::info!("worker {} dry-run state reset", worker.id());
                let _ = reply.send(ok);
            }
        }
    }
}

async fn publish_now(worker: &BotWorker, store: &dyn StateStore) {
    if let Err(e) = heartbeat::publish(worker, store).await {
        // the next heartbeat retries; a missed push never kills the worker
        tracing::warn!("worker {} status push failed: {}", worker.id(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderType, Side, Symbol};

    fn worker() -> BotWorker {
        BotWorker::new(WorkerId::new(7).unwrap(), &WorkerSettings::default())
    }

    #[test]
    fn lifecycle_transitions() {
        let w = worker();
        assert_eq!(w.status(), WorkerStatus::Created);
        assert!(w.start());
        assert_eq!(w.status(), WorkerStatus::Running);
        // running -> running self-loop on repeated start
        assert!(w.start());
        assert!(w.stop());
        assert_eq!(w.status(), WorkerStatus::Stopped);
        // external restart path: stopped -> running
        assert!(w.start());
        assert_eq!(w.status(), WorkerStatus::Running);
    }

    #[test]
    fn stop_twice_is_idempotent() {
        let w = worker();
        w.start();
        assert!(w.stop());
        assert!(w.stop());
        assert_eq!(w.status(), WorkerStatus::Stopped);
    }

    #[test]
    fn simulated_fill_charges_fee_and_tracks_position() {
        let w = worker();
        let order = Order::new(
            Symbol::new("BTC/USDT"),
            Side::Buy,
            OrderType::Limit,
            Decimal::ONE,
            Some(Decimal::from(100)),
        )
        .unwrap();
        let trade = w.simulate_fill(&order).unwrap();
        assert_eq!(trade.fee, Decimal::ONE); // 1 * 100 * 0.01
        let paper = w.paper();
        assert_eq!(paper.fills, 1);
        assert_eq!(paper.positions.len(), 1);
        assert_eq!(paper.balances[0].free, Decimal::from(10_000) - Decimal::from(101));
    }

    #[test]
    fn sell_without_position_is_rejected() {
        let w = worker();
        let order = Order::new(
            Symbol::new("ETH/USDT"),
            Side::Sell,
            OrderType::Limit,
            Decimal::ONE,
            Some(Decimal::from(2_000)),
        )
        .unwrap();
        assert!(matches!(
            w.simulate_fill(&order),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[test]
    fn dry_reset_restores_starting_state() {
        let w = worker();
        let order = Order::new(
            Symbol::new("BTC/USDT"),
            Side::Buy,
            OrderType::Limit,
            Decimal::ONE,
            Some(Decimal::from(100)),
        )
        .unwrap();
        w.simulate_fill(&order).unwrap();
        assert!(w.dry_reset());
        let paper = w.paper();
        assert_eq!(paper.fills, 0);
        assert!(paper.positions.is_empty());
        assert_eq!(paper.balances[0].free, Decimal::from(10_000));
    }

    #[test]
    fn snapshot_carries_params_until_redacted() {
        let mut settings = WorkerSettings::default();
        settings
            .params
            .insert("api_key".into(), Value::String("secret".into()));
        let w = BotWorker::new(WorkerId::new(9).unwrap(), &settings);
        let snap = w.snapshot();
        assert!(snap.params.as_ref().is_some_and(|p| p.contains_key("api_key")));
        assert!(snap.redacted().params.is_none());
    }
}
