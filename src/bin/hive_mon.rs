use std::sync::Arc;

use hivetx::core::config::FleetConfig;
use hivetx::core::types::WorkerId;
use hivetx::managers::Managers;
use hivetx::rpc::ControlClient;
use hivetx::store::StoreClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = FleetConfig::load_default();
    let store = Arc::new(StoreClient::new(&config.store));
    let control = Arc::new(ControlClient::new(&config.control));
    let managers = Managers::new(&config, store, control)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    println!("==================================================");
    println!("🔍 HiveTX Fleet Monitor 🔍");
    println!("==================================================\n");

    match args.first().map(String::as_str) {
        Some("top") => show_top(&managers).await,
        Some("list") => show_list(&managers).await,
        Some("tickers") => show_tickers(&managers, args.get(1)).await,
        Some("trades") => show_trades(&managers).await,
        Some("sites") => show_sites(&managers).await,
        Some(verb @ ("start" | "stop" | "ping" | "reload" | "dry-reset")) => {
            run_lifecycle_verb(&managers, verb, args.get(1)).await
        }
        Some("status") => show_status(&managers, args.get(1)).await,
        _ => {
            println!("usage: hive-mon <command>\n");
            println!("  top                fleet snapshot (params redacted)");
            println!("  list               known workers + liveness sweep");
            println!("  tickers <exch>     symbols tracked on an exchange");
            println!("  trades             trade-status keys and values");
            println!("  sites              crawl sites");
            println!("  status <id>        one worker's lifecycle state");
            println!("  start|stop|ping|reload|dry-reset <id>");
            Ok(())
        }
    }
}

async fn show_top(managers: &Managers) -> anyhow::Result<()> {
    println!("-- 📊 Fleet Top:");
    let rows = managers.process.get_top().await?;
    if rows.is_empty() {
        println!("    No workers have published yet.");
        return Ok(());
    }
    for row in rows {
        let mode = if row.dry_run { "dry" } else { "live" };
        println!(
            "    [{}] pid {} | {} | {} | {} | up {}s | beat {}",
            row.worker_id, row.pid, row.status, row.strategy, mode, row.uptime_secs, row.heartbeat_at
        );
    }
    Ok(())
}

async fn show_list(managers: &Managers) -> anyhow::Result<()> {
    println!("-- 🗂  Known Workers:");
    let known = managers.bots.list();
    if known.is_empty() {
        println!("    Registry is empty (worker.known_workers in fleet.toml).");
        return Ok(());
    }
    for (id, alive) in managers.bots.ping_all().await {
        let mark = if alive { "✅ alive" } else { "❌ unreachable" };
        println!("    worker {}: {}", id, mark);
    }
    println!("    {} workers registered.", known.len());
    Ok(())
}

async fn show_tickers(managers: &Managers, exchange: Option<&String>) -> anyhow::Result<()> {
    let Some(exchange) = exchange else {
        anyhow::bail!("usage: hive-mon tickers <exchange>");
    };
    println!("-- 💹 Tickers on {}:", exchange);
    let symbols = managers.ticks.get_tickers(exchange).await?;
    if symbols.is_empty() {
        println!("    None tracked.");
    }
    for symbol in symbols {
        println!("    {}", symbol);
    }
    Ok(())
}

async fn show_trades(managers: &Managers) -> anyhow::Result<()> {
    println!("-- 📜 Trade Status:");
    let keys = managers.trades.list_status_keys().await?;
    if keys.is_empty() {
        println!("    No entries.");
        return Ok(());
    }
    for key in keys {
        if let Some(entry) = managers.trades.get_status(&key).await? {
            println!("    {} = {:.4} (at {})", entry.key, entry.value, entry.updated_at);
        }
    }
    Ok(())
}

async fn show_sites(managers: &Managers) -> anyhow::Result<()> {
    println!("-- 🌐 Crawl Sites:");
    let sites = managers.users.list_sites().await?;
    if sites.is_empty() {
        println!("    None configured.");
    }
    for site in sites {
        let accounts = managers.users.get_crawling_list(&site).await?;
        println!("    {}: {} accounts", site, accounts.len());
    }
    Ok(())
}

async fn show_status(managers: &Managers, id: Option<&String>) -> anyhow::Result<()> {
    let id = parse_id(id, "status")?;
    match managers.process.get_worker(id).await? {
        Some(row) => println!("    worker {}: {} (pid {})", id, row.status, row.pid),
        None => println!("    worker {}: never published", id),
    }
    Ok(())
}

async fn run_lifecycle_verb(
    managers: &Managers,
    verb: &str,
    id: Option<&String>,
) -> anyhow::Result<()> {
    let id = parse_id(id, verb)?;
    let ok = match verb {
        "start" => managers.bots.start(id).await?,
        "stop" => managers.bots.stop(id).await?,
        "ping" => managers.bots.ping(id).await?,
        "reload" => managers.bots.reload(id).await?,
        "dry-reset" => managers.bots.dry_reset(id).await?,
        _ => unreachable!("verb list is matched in main"),
    };
    let mark = if ok { "✅" } else { "❌" };
    println!("    {} {} worker {} -> {}", mark, verb, id, ok);
    Ok(())
}

fn parse_id(id: Option<&String>, verb: &str) -> anyhow::Result<WorkerId> {
    let Some(raw) = id else {
        anyhow::bail!("usage: hive-mon {verb} <worker-id>");
    };
    Ok(raw.parse()?)
}
