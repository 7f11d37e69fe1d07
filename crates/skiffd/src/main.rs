//! `skiffd` — the skiff account store daemon.
//!
//! Binary entrypoint that serves the per-account entry store over HTTP.
//!
//! # Usage
//!
//! ```text
//! skiffd start                          # start with defaults
//! skiffd start -c skiff.toml            # start with a config file
//! skiffd start -d ./accounts -l 127.0.0.1:2525
//! ```

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skiff_api::{StoreServer, StoreServerConfig};
use skiff_store::FileStore;
use tracing::info;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "skiffd", version, about = "skiff account store daemon")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the store daemon.
    Start {
        /// Override the accounts root directory.
        #[arg(short = 'd', long, env = "SKIFF_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Override the listen address (e.g. "127.0.0.1:2525").
        #[arg(short = 'l', long, env = "SKIFF_LISTEN_ADDR")]
        listen_addr: Option<String>,

        /// Override the log level filter (e.g. "debug").
        #[arg(long, env = "SKIFF_LOG_LEVEL")]
        log_level: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Start {
            data_dir,
            listen_addr,
            log_level,
        } => {
            // CLI args override config file values.
            if let Some(dir) = data_dir {
                config.node.accounts_root = dir;
            }
            if let Some(addr) = listen_addr {
                config.node.listen_addr = addr;
            }
            if let Some(level) = log_level {
                config.log.level = level;
            }
            telemetry::init(&config.log.level);
            cmd_start(config).await
        }
    }
}

async fn cmd_start(config: CliConfig) -> Result<()> {
    info!("starting skiffd");
    info!(
        accounts_root = %config.node.accounts_root.display(),
        listen_addr = %config.node.listen_addr,
        "node configuration"
    );

    let store = Arc::new(
        FileStore::new(&config.node.accounts_root).context("failed to initialize entry store")?,
    );

    let server = StoreServer::new(StoreServerConfig {
        store: store.clone(),
    });

    info!(addr = %config.node.listen_addr, "store API ready");
    server
        .serve_with_shutdown(&config.node.listen_addr, shutdown_signal())
        .await
        .context("store server failed")?;

    // Walk the handle cache and close every account database.
    store.close_all();

    info!("shutdown complete");
    Ok(())
}

/// Wait for a SIGTERM or SIGINT (Ctrl-C) signal.
///
/// When the returned future resolves, the server stops accepting new
/// connections and drains in-flight requests before exiting.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT (Ctrl-C), initiating graceful shutdown"),
        () = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}
