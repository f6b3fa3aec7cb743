//! Manager composition layer - one narrow manager per domain
//!
//! Each manager translates a domain query into store reads (and, for the
//! imperative verbs, control RPC calls). Composition is additive: the
//! facade holds one instance of each domain behind a named field, so
//! method namespaces can never collide. Managers keep no state of their
//! own; every read hits the store.

pub mod accounts;
pub mod bots;
pub mod ohlcv;
pub mod process;
pub mod ticks;
pub mod trades;
pub mod users;

use std::sync::Arc;

pub use accounts::AccountManager;
pub use bots::BotManager;
pub use ohlcv::OhlcvManager;
pub use process::ProcessManager;
pub use ticks::TickManager;
pub use trades::TradeManager;
pub use users::UserManager;

use crate::core::config::FleetConfig;
use crate::core::error::Result;
use crate::core::traits::StateStore;
use crate::rpc::client::ControlClient;

/// The composition facade handed to control clients.
pub struct Managers {
    pub ticks: TickManager,
    pub ohlcv: OhlcvManager,
    pub accounts: AccountManager,
    pub bots: BotManager,
    pub trades: TradeManager,
    pub users: UserManager,
    pub process: ProcessManager,
}

impl Managers {
    pub fn new(
        config: &FleetConfig,
        store: Arc<dyn StateStore>,
        control: Arc<ControlClient>,
    ) -> Result<Self> {
        Ok(Self {
            ticks: TickManager::new(store.clone()),
            ohlcv: OhlcvManager::new(store.clone()),
            accounts: AccountManager::new(store.clone()),
            bots: BotManager::new(config.known_ids()?, control),
            trades: TradeManager::new(store.clone()),
            users: UserManager::new(store.clone()),
            process: ProcessManager::new(store),
        })
    }
}
