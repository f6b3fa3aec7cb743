//! Central configuration for the fleet.
//!
//! Loads from `fleet.toml`. Constructed once at process start and passed by
//! reference into every component; nothing reads config through a global.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::error::{Error, Result};
use crate::core::types::WorkerId;

/// Shared State Store endpoint and client behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// TCP address of the store server
    #[serde(default = "default_store_addr")]
    pub addr: String,
    /// Per-operation deadline; overrun is a failure, never a hang
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    /// Bounded retry attempts for transient unavailability
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base delay for exponential backoff between retries
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

/// Control-plane RPC addressing. A worker's endpoint is
/// `bind_host : base_port + worker_id` on both the server and client side.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

/// Per-worker runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// Strategy name this worker runs (execution is external)
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Strategy parameters. Internal-only: never leaves the control plane
    /// unredacted.
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Enter `running` at boot instead of waiting for a `start` command
    #[serde(default = "default_autostart")]
    pub autostart: bool,
    /// Simulated starting balance for dry-run fills (USD)
    #[serde(default = "default_paper_balance_usd")]
    pub paper_balance_usd: f64,
    /// Simulated market fee rate applied to dry-run fills.
    /// A fraction in [0, 1), e.g. 0.01 = 1%.
    #[serde(default = "default_simul_mktfee")]
    pub simul_mktfee: f64,
    /// The fleet registry: every worker id a control client may address
    #[serde(default)]
    pub known_workers: Vec<u32>,
}

fn default_store_addr() -> String {
    "127.0.0.1:6431".to_string()
}
fn default_op_timeout_ms() -> u64 {
    2_000
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_base_ms() -> u64 {
    100
}
fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}
fn default_base_port() -> u16 {
    7_700
}
fn default_call_timeout_ms() -> u64 {
    3_000
}
fn default_strategy() -> String {
    "idle".to_string()
}
fn default_heartbeat_interval_ms() -> u64 {
    1_000
}
fn default_dry_run() -> bool {
    true
}
fn default_autostart() -> bool {
    true
}
fn default_paper_balance_usd() -> f64 {
    10_000.0
}
fn default_simul_mktfee() -> f64 {
    0.01
}

/// Top-level config file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub worker: WorkerSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            addr: default_store_addr(),
            op_timeout_ms: default_op_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            base_port: default_base_port(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            params: Map::new(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            dry_run: default_dry_run(),
            autostart: default_autostart(),
            paper_balance_usd: default_paper_balance_usd(),
            simul_mktfee: default_simul_mktfee(),
            known_workers: Vec::new(),
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            store: StoreConfig::default(),
            control: ControlConfig::default(),
            worker: WorkerSettings::default(),
        }
    }
}

impl FleetConfig {
    /// Load and validate config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: FleetConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location (project root fleet.toml).
    pub fn load_default() -> Self {
        let candidates = [
            "fleet.toml",
            concat!(env!("CARGO_MANIFEST_DIR"), "/fleet.toml"),
        ];

        for path in &candidates {
            match Self::load(Path::new(path)) {
                Ok(cfg) => {
                    tracing::info!("📋 Loaded config from {}", path);
                    return cfg;
                }
                Err(Error::Config(msg)) if msg.contains("failed to read") => continue,
                Err(e) => {
                    tracing::warn!("⚠️ Ignoring broken config {}: {}", path, e);
                    continue;
                }
            }
        }

        tracing::warn!("⚠️ No fleet.toml found, using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.op_timeout_ms == 0 {
            return Err(Error::Config("store.op_timeout_ms must be positive".into()));
        }
        if self.worker.heartbeat_interval_ms == 0 {
            return Err(Error::Config(
                "worker.heartbeat_interval_ms must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.worker.simul_mktfee) {
            return Err(Error::Config(format!(
                "worker.simul_mktfee must be a fraction in [0, 1), got {}",
                self.worker.simul_mktfee
            )));
        }
        if self.worker.paper_balance_usd < 0.0 {
            return Err(Error::Config(
                "worker.paper_balance_usd cannot be negative".into(),
            ));
        }
        for &raw in &self.worker.known_workers {
            WorkerId::new(raw)?;
            let port = self.control.base_port as u64 + raw as u64;
            if port > u16::MAX as u64 {
                return Err(Error::Config(format!(
                    "control.base_port {} + worker id {} exceeds the port range",
                    self.control.base_port, raw
                )));
            }
        }
        Ok(())
    }

    /// The fleet registry as validated ids.
    pub fn known_ids(&self) -> Result<Vec<WorkerId>> {
        self.worker
            .known_workers
            .iter()
            .map(|&raw| WorkerId::new(raw))
            .collect()
    }
}
