//! Custodia - vault custody reconciler.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! custodia --controller 0x...
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/custodia RPC_URL=http://localhost:8545 custodia
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use custodia_core::error::EngineError;
use custodia_core::metrics::init_metrics;
use custodia_core::models::Address;
use custodia_core::ports::{EntityStore, EventSource};
use custodia_core::services::{ReconcilerConfig, ReconcilerService};
use custodia_evm::{EthEventSource, EthTokenReader, LogSourceConfig, RpcClient, RpcClientConfig};
use custodia_graphql::{ServerConfig, build_schema, serve_with_shutdown};
use custodia_handlers::build_registry;
use custodia_storage::{Database, DatabaseConfig, PgEntityStore};

/// Custodia CLI - vault custody reconciler.
#[derive(Parser, Debug)]
#[command(name = "custodia")]
#[command(about = "Custodia - custody ledger reconciler for vault contracts")]
#[command(version)]
struct Cli {
    /// EVM node HTTP JSON-RPC URL.
    #[arg(long, env = "RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/custodia"
    )]
    database_url: String,

    /// Controller contract address (emits collection creations and
    /// computes vault addresses).
    #[arg(long, env = "CONTROLLER_ADDRESS", value_parser = parse_address)]
    controller: Address,

    /// Null address treated as the "minted" sentinel.
    #[arg(
        long,
        env = "NULL_ADDRESS",
        default_value = "0x0000000000000000000000000000000000000000",
        value_parser = parse_address
    )]
    null_address: Address,

    /// First block to reconcile from.
    #[arg(long, env = "START_BLOCK", default_value = "0")]
    start_block: u64,

    /// Maximum blocks per log-fetch range.
    #[arg(long, env = "CHUNK_SIZE", default_value = "1000")]
    chunk_size: u64,

    /// Polling interval in seconds once the head is reached.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "12")]
    poll_interval_secs: u64,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Purge all reconciled state from the database and exit.
    ///
    /// This will delete all vaults, balances, custody records and token
    /// descriptors. Schema/migrations are preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Parse an address CLI argument.
fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_hex(s).map_err(|_| format!("Invalid address '{s}': expected 20 bytes of hex"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>()
    {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!(
                        "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                        e
                    );
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Custodia");
    debug!(rpc_url = %cli.rpc_url, "Ledger endpoint");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");
    debug!(controller = %cli.controller, "Controller contract");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    let reconciler_db_config = DatabaseConfig::for_reconciler(&cli.database_url);
    let api_db_config = DatabaseConfig::for_api(&cli.database_url);

    info!("🗄️  Connecting to database...");
    let db = Database::connect(&reconciler_db_config)
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, cli.yes).await;
    }

    let api_db = Database::connect(&api_db_config)
        .await
        .context("Failed to create GraphQL database pool")?;

    let db = Arc::new(db);
    let api_db = Arc::new(api_db);

    let store: Arc<dyn EntityStore> = Arc::new(PgEntityStore::new(db.clone()));
    let api_store: Arc<dyn EntityStore> = Arc::new(PgEntityStore::new(api_db.clone()));

    // ─────────────────────────────────────────────────────────────────────────
    // 📡 LEDGER CONNECTION
    // ─────────────────────────────────────────────────────────────────────────
    info!("📡 Connecting to ledger node...");
    let client = Arc::new(
        RpcClient::new(RpcClientConfig {
            http_url: cli.rpc_url.clone(),
        })
        .context("Failed to create RPC client")?,
    );

    let source = Arc::new(EthEventSource::new(
        client.clone(),
        LogSourceConfig {
            controller: cli.controller,
            start_block: cli.start_block,
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
            chunk_size: cli.chunk_size,
        },
    ));

    let head = source
        .latest_block()
        .await
        .context("Failed to reach the ledger node")?;
    info!(head = head, start = cli.start_block, "🔗 Ledger connected");

    let reader = Arc::new(EthTokenReader::new(client, cli.controller));
    let handlers = Arc::new(build_registry(store, reader, cli.null_address));

    let reconciler = ReconcilerService::new(ReconcilerConfig::default(), source, handlers);

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut graphql_shutdown_rx = shutdown_tx.subscribe();

    let graphql_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: cli.graphql_port,
        enable_playground: true,
    };

    let schema = build_schema(api_store);
    let graphql_port = cli.graphql_port;
    let graphql_handle = tokio::spawn(
        async move {
            let shutdown_signal = async move {
                while !*graphql_shutdown_rx.borrow() {
                    if graphql_shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            };

            if let Err(e) = serve_with_shutdown(schema, graphql_config, shutdown_signal).await {
                error!(error = %e, "❌ Server error");
            }
            debug!("Server stopped");
        }
        .instrument(info_span!("graphql")),
    );

    let reconciler_handle = tokio::spawn(
        async move {
            if let Err(e) = reconciler.run(shutdown_rx).await {
                match &e {
                    EngineError::ShutdownRequested => {}
                    _ => error!(error = ?e, "❌ Reconciler error"),
                }
            }
        }
        .instrument(info_span!("reconciler")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Custodia ready");
    info!("   ⚡ GraphQL:  http://localhost:{}/graphql", graphql_port);
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(30), reconciler_handle).await {
        Ok(_) => debug!("Reconciler stopped"),
        Err(_) => warn!("⚠️  Reconciler shutdown timed out"),
    }

    match tokio::time::timeout(Duration::from_secs(10), graphql_handle).await {
        Ok(_) => debug!("GraphQL stopped"),
        Err(_) => warn!("⚠️  GraphQL shutdown timed out"),
    }

    db.close().await;
    api_db.close().await;

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL reconciled state!");
    warn!("   - All vaults, balances and custody records");
    warn!("   - All token descriptors");
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");
    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   🏦 Vaults removed: {}", stats.vaults_removed);
    info!("   💰 Balances removed: {}", stats.balances_removed);
    info!("   🖼️  Custody records removed: {}", stats.custody_removed);
    info!("   Reconciliation will restart from the configured start block");

    Ok(())
}
