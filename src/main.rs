//! Trade Store - Entry Point
//!
//! Subcommands:
//! - `serve` (default): run the HTTP ingest server over a shared store
//! - `generate`: populate the database with synthetic trades
//! - `analyze`: print average prices per symbol/direction as CSV
//!
//! Serve wiring sequence:
//! 1. Load config.toml (optional) + env overrides + validate
//! 2. Init tracing (JSON structured logging to stderr)
//! 3. Open SQLite backend, ensure schema, prepare insert
//! 4. Build Prometheus metrics and attach them to the store
//! 5. Spawn ingest server (/trade, /flush, /live, /ready, /metrics)
//! 6. Wait for SIGINT → stop server → close store (final flush)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trade_store::adapters::http::{IngestServer, IngestState};
use trade_store::adapters::metrics::StoreMetrics;
use trade_store::adapters::persistence::{SqliteBackend, TradeReader};
use trade_store::config::{self, AppConfig};
use trade_store::ports::observer::StoreObserver;
use trade_store::usecases::{SharedTradeStore, TradeGenerator, TradeStore, populate_and_close};

#[derive(Parser)]
#[command(name = "trade-store")]
#[command(about = "Buffered SQLite trade store", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file (optional)
    #[arg(long, env = "TRADE_STORE_CONFIG", default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP ingest server
    Serve,

    /// Insert synthetic trades into the configured database
    Generate {
        /// Number of trades to insert
        #[arg(long, default_value_t = 100_000)]
        count: usize,

        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print average price per (symbol, buy) for a time window as CSV
    Analyze {
        /// Window start (RFC 3339 or YYYY-MM-DDTHH:MM:SS, UTC)
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,

        /// Window end (RFC 3339 or YYYY-MM-DDTHH:MM:SS, UTC)
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let config = config::loader::load_config(&cli.config)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Generate { count, seed } => {
            tokio::task::spawn_blocking(move || generate(&config, count, seed)).await?
        }
        Commands::Analyze { start, end } => analyze(&config, start, end),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));

    if config.service.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .map(|t| t.and_utc())
        .map_err(|e| format!("invalid time {value:?}: {e}"))
}

fn open_backend(config: &AppConfig) -> Result<SqliteBackend> {
    SqliteBackend::connect_with_timeout(
        &config.store.db_file,
        Duration::from_millis(config.store.busy_timeout_ms),
    )
    .context("Failed to connect to trade database")
}

async fn serve(config: AppConfig) -> Result<()> {
    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        db_file = %config.store.db_file,
        capacity = config.store.buffer_capacity,
        "Starting trade store"
    );

    // ── 3. Open backend + store ─────────────────────────────
    let backend = open_backend(&config)?;
    let mut store = SharedTradeStore::open(backend, config.store.buffer_capacity)
        .context("Failed to initialize trade store")?;

    // ── 4. Metrics ──────────────────────────────────────────
    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(StoreMetrics::new().context("Failed to register metrics")?);
        store = store.with_observer(Arc::clone(&metrics) as Arc<dyn StoreObserver>);
        Some(metrics)
    } else {
        None
    };
    let store = Arc::new(store);

    // ── 5. Ingest server ────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let state = Arc::new(IngestState::new(Arc::clone(&store), metrics));
    let server = IngestServer::new(state, config.server.bind_address.clone());
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(shutdown_rx).await {
            error!(error = %e, "Ingest server failed");
        }
    });

    // ── 6. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    let _ = shutdown_tx.send(());
    if tokio::time::timeout(Duration::from_secs(30), server_handle)
        .await
        .is_err()
    {
        warn!("Ingest server did not stop within 30s");
    }

    // Final flush runs on the blocking pool.
    let closing = Arc::clone(&store);
    match tokio::task::spawn_blocking(move || closing.close()).await? {
        Ok(()) => info!("Shutdown complete"),
        Err(e) => {
            error!(error = %e, "Trade store close failed");
            return Err(e).context("Failed to close trade store");
        }
    }
    Ok(())
}

fn generate(config: &AppConfig, count: usize, seed: Option<u64>) -> Result<()> {
    let backend = open_backend(config)?;
    info!(location = backend.location(), count, "Generating trades");
    let store = TradeStore::open(backend, config.store.buffer_capacity)
        .context("Failed to initialize trade store")?;
    let mut generator = TradeGenerator::new(seed);

    let added = populate_and_close(store, &mut generator, count)
        .context("Failed to generate trades")?;

    println!("inserted {added} records");
    Ok(())
}

fn analyze(config: &AppConfig, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    let reader = TradeReader::open(&config.store.db_file)
        .context("Failed to open trade database")?;
    let averages = reader
        .average_prices(start, end)
        .context("Failed to compute average prices")?;

    println!("symbol,buy,price");
    for row in averages {
        println!("{},{},{}", row.symbol, row.buy, row.price);
    }
    Ok(())
}
