//! # Skinbay Market Daemon
//!
//! Keeps the marketplace's timeouts honest: abandoned cart holds go back
//! on sale and finished rental contracts are closed.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Daemon Startup                                  │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter                                │
//! │     • Default: info,skinbay=debug,sqlx=warn (override with RUST_LOG)    │
//! │                                                                         │
//! │  2. Load Configuration ───────────────────────────────────────────────► │
//! │     • --config <PATH>, else the platform config dir's market.toml       │
//! │     • SKINBAY_* environment overrides                                   │
//! │                                                                         │
//! │  3. Connect to Database ──────────────────────────────────────────────► │
//! │     • SQLite with WAL mode                                              │
//! │     • Run pending migrations                                            │
//! │                                                                         │
//! │  4. Spawn Expiry Sweeper ─────────────────────────────────────────────► │
//! │     • Skipped when [sweeper] enabled = false                            │
//! │                                                                         │
//! │  5. Wait for Ctrl+C / SIGTERM, stop the sweeper, close the pool        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `--once` runs a single sweep pass and exits, for cron-style deployments.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skinbay_db::Database;
use skinbay_jobs::{ExpirySweeper, MarketConfig};

/// Command line options.
#[derive(Debug, Default)]
struct Options {
    config_path: Option<PathBuf>,
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let Some(options) = parse_args(std::env::args().skip(1))? else {
        return Ok(());
    };

    info!("Starting Skinbay market daemon");

    let config = MarketConfig::load(options.config_path).context("Failed to load configuration")?;
    info!(
        database = %config.database.path.display(),
        window_secs = config.reservations.window_secs,
        sweeper_enabled = config.sweeper.enabled,
        "Configuration loaded"
    );

    let db = Database::new(config.to_db_config())
        .await
        .context("Failed to open market database")?;
    info!("Database connected and migrations applied");

    let (sweeper, handle) = ExpirySweeper::new(db.clone(), config.sweeper.clone());

    if options.once {
        let response = sweeper.run_once().await.context("Expiry sweep failed")?;
        info!(
            released_holds = response.released_holds,
            expired_contracts = response.expired_contracts,
            "Single sweep complete"
        );
        db.close().await;
        return Ok(());
    }

    let task = if config.sweeper.enabled {
        Some(tokio::spawn(sweeper.run()))
    } else {
        warn!("Expiry sweeper disabled; holds and contracts will not expire on their own");
        None
    };

    shutdown_signal().await;

    if let Some(task) = task {
        handle.shutdown().await.context("Failed to stop expiry sweeper")?;
        task.await.context("Expiry sweeper task panicked")?;
    }

    db.close().await;
    info!("Market daemon stopped");
    Ok(())
}

/// Parses command line arguments. `None` means help was printed.
fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Options>> {
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                options.config_path = Some(PathBuf::from(path));
            }
            "--once" => options.once = true,
            "--help" | "-h" => {
                println!("Skinbay Market Daemon");
                println!();
                println!("Usage: market-daemon [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir/market.toml)");
                println!("      --once           Run one sweep pass and exit");
                println!("  -h, --help           Show this help message");
                return Ok(None);
            }
            other => anyhow::bail!("Unknown argument: {other}"),
        }
    }

    Ok(Some(options))
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=skinbay=trace` - Show trace for skinbay crates only
/// - Default: `info,skinbay=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,skinbay=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping...");
}
