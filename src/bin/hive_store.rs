use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use hivetx::core::config::FleetConfig;
use hivetx::store::{StoreEngine, StoreServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hive_store=debug"));
    fmt().with_env_filter(filter).init();

    let config = match std::env::args().nth(1) {
        Some(path) => FleetConfig::load(Path::new(&path))?,
        None => FleetConfig::load_default(),
    };

    let engine = Arc::new(StoreEngine::new());
    let server = StoreServer::bind(&config.store.addr, engine).await?;
    tracing::info!("🐝 hive-store serving on {}", server.local_addr()?);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("hive-store shutting down"),
    }
    Ok(())
}
