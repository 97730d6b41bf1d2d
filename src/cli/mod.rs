//! CLI module for sqlbridge
//!
//! Commands:
//! - serve: boot the HTTP server
//! - check: one-shot connectivity probe, prints health JSON

use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::AppConfig;
use crate::http_server::{AppState, HttpServer};
use crate::pool::PoolManager;

/// sqlbridge - HTTP-to-SQL middleware
#[derive(Parser, Debug)]
#[command(name = "sqlbridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Override the listening port from the environment
        #[arg(long)]
        port: Option<u16>,
    },

    /// Probe database connectivity once and exit
    Check,
}

/// CLI errors; all fatal
#[derive(Debug, Error)]
pub enum CliError {
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("database unreachable: {0}")]
    Unreachable(String),
}

/// Parse arguments, load configuration and dispatch
pub fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.http.port = port;
            }
            runtime.block_on(serve(config))
        }
        Command::Check => runtime.block_on(check(config)),
    }
}

async fn serve(config: AppConfig) -> Result<(), CliError> {
    let state = Arc::new(AppState::new(config));
    HttpServer::new(state).start().await?;
    Ok(())
}

async fn check(config: AppConfig) -> Result<(), CliError> {
    let manager = PoolManager::new(config.db.clone());
    // One attempt is enough for a probe; the detail ends up in the health
    // report either way
    let _ = manager.ensure_pool(1).await;
    let health = manager.check_health().await;

    println!(
        "{}",
        serde_json::json!({
            "connected": health.connected,
            "detail": health.detail,
            "database": config.db.masked(),
        })
    );

    if health.connected {
        Ok(())
    } else {
        Err(CliError::Unreachable(health.detail))
    }
}
