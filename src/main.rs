use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use hivetx::core::config::FleetConfig;
use hivetx::core::traits::StateStore;
use hivetx::core::types::WorkerId;
use hivetx::rpc::server::ControlServer;
use hivetx::store::client::StoreClient;
use hivetx::worker::{BotWorker, heartbeat, run_lifecycle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Initialize logger
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hivetx=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    tracing::info!("🐝 HiveTX worker starting...");

    // 2. Identity and config, constructed once and passed down
    let id: WorkerId = match std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WORKER_ID").ok())
    {
        Some(raw) => raw.parse()?,
        None => anyhow::bail!("usage: hivetx <worker-id> [fleet.toml]  (or set WORKER_ID)"),
    };
    let config_path = std::env::args().nth(2).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => FleetConfig::load(path)?,
        None => FleetConfig::load_default(),
    };

    // 3. Store client + worker state
    let store: Arc<dyn StateStore> = Arc::new(StoreClient::new(&config.store));
    let worker = Arc::new(BotWorker::new(id, &config.worker));
    if config.worker.autostart {
        worker.start();
    }

    // 4. Lifecycle task, heartbeat, control endpoint
    let (command_tx, command_rx) = flume::unbounded();
    tokio::spawn(run_lifecycle(
        worker.clone(),
        store.clone(),
        config_path,
        command_rx,
    ));
    tokio::spawn(heartbeat::run(
        worker.clone(),
        store.clone(),
        Duration::from_millis(config.worker.heartbeat_interval_ms),
    ));

    let addr = format!(
        "{}:{}",
        config.control.bind_host,
        config.control.base_port as u32 + id.get()
    );
    let server = ControlServer::bind(&addr, worker.clone(), command_tx, config.known_ids()?).await?;
    tokio::spawn(server.run());

    tracing::info!(
        "worker {} up (strategy={}, dry_run={})",
        id,
        config.worker.strategy,
        config.worker.dry_run
    );

    // 5. Run until interrupted, then flush a final stopped status
    tokio::signal::ctrl_c().await?;
    tracing::info!("worker {} shutting down", id);
    worker.stop();
    if let Err(e) = heartbeat::publish(&worker, store.as_ref()).await {
        tracing::warn!("final status flush failed: {}", e);
    }
    Ok(())
}
