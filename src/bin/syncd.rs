use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use monitor_sync::{
    actors::SyncHandle,
    config::{Config, StorageConfig, read_config_file},
    source::ZabbixClient,
    storage::{EntityStore, sqlite::SqliteStore},
    sync::{SyncOrchestrator, SyncSettings},
    util,
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Mirror Zabbix hosts, items and history into a relational store")]
struct Args {
    /// Config file (defaults apply when omitted)
    #[arg(short)]
    file: Option<String>,

    /// Run a single sync and exit
    #[arg(long)]
    once: bool,

    /// Lower log verbosity (-q info, -qq warn)
    #[arg(short, action = clap::ArgAction::Count)]
    quiet: u8,
}

fn init(quiet: u8) {
    let level = match quiet {
        0 => LevelFilter::TRACE,
        1 => LevelFilter::INFO,
        _ => LevelFilter::WARN,
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("monitor_sync", level),
        ("monitor_syncd", level),
        ("tower_http", LevelFilter::DEBUG.min(level)),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.file {
        Some(path) => read_config_file(path).with_context(|| format!("failed to read {path}"))?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.quiet);
    trace!("started with args: {args:?}");

    util::load_dotenv();
    let config = load_config(&args)?;

    let store: Arc<dyn EntityStore> = match &config.storage {
        StorageConfig::Sqlite { path } => Arc::new(SqliteStore::new(path).await?),
    };

    let source = Arc::new(ZabbixClient::new(&config.source)?);
    info!("syncing from {}", source.endpoint());

    let orchestrator = Arc::new(SyncOrchestrator::new(
        source,
        store.clone(),
        SyncSettings::from(&config.sync),
    ));

    if args.once {
        let result = orchestrator.run_sync().await;
        store.close().await?;
        let report = result?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let scheduler = SyncHandle::spawn(
        orchestrator,
        Duration::from_secs(config.sync.interval_secs),
        config.sync.run_on_start,
    );

    if let Some(section) = &config.api {
        serve_api(section, store.clone(), scheduler.clone()).await?;
    } else {
        debug!("no api section configured, HTTP server disabled");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");

    if let Err(e) = scheduler.shutdown().await {
        error!("scheduler did not shut down cleanly: {e:#}");
    }
    store.close().await?;

    Ok(())
}

#[cfg(feature = "api")]
async fn serve_api(
    section: &monitor_sync::config::ApiSection,
    store: Arc<dyn EntityStore>,
    scheduler: SyncHandle,
) -> anyhow::Result<()> {
    use monitor_sync::api::{ApiConfig, ApiState, spawn_api_server};

    let addr = spawn_api_server(ApiConfig::from(section), ApiState::new(store, scheduler)).await?;
    info!("dashboard API available at http://{addr}/api/v1");
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn serve_api(
    _section: &monitor_sync::config::ApiSection,
    _store: Arc<dyn EntityStore>,
    _scheduler: SyncHandle,
) -> anyhow::Result<()> {
    tracing::warn!("api section ignored: built without the `api` feature");
    Ok(())
}
