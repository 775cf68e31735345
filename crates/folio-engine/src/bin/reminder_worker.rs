//! # Reminder Worker
//!
//! Runs the reminder scheduler against the configured database until
//! Ctrl+C or SIGTERM.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      reminder-worker                         │
//! │                                                              │
//! │  every poll_interval ──► acquire lease ──► due documents     │
//! │                               │                 │            │
//! │                               │                 ▼            │
//! │                          release ◄──── render + mail + log   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! FOLIO_SIGNING_SECRET=... cargo run -p folio-engine --bin reminder-worker
//! cargo run -p folio-engine --bin reminder-worker -- --config ./folio.toml
//! ```
//!
//! Several workers may share one database; the lease keeps their ticks apart.

use anyhow::{bail, Context};
use folio_engine::{EngineConfig, FolioEngine, LoggingMailer, LoggingRenderer};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,folio=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = parse_args()?;
    let config = EngineConfig::load(config_path).context("Failed to load configuration")?;
    info!(
        db = ?config.database.path,
        poll_secs = config.reminders.poll_interval_secs,
        "Configuration loaded"
    );

    // Delivery collaborators here only log; real transports plug in through the same traits.
    let engine = FolioEngine::open(config, Arc::new(LoggingMailer), Arc::new(LoggingRenderer), None)
        .await
        .context("Failed to start engine")?;

    let (runner, handle) = engine.reminders().runner();
    let task = tokio::spawn(runner.run());

    shutdown_signal().await?;
    handle.shutdown().await;
    task.await.context("Reminder runner panicked")?;

    engine.close().await;
    info!("Reminder worker stopped");
    Ok(())
}

fn parse_args() -> anyhow::Result<Option<PathBuf>> {
    let args: Vec<String> = env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--config needs a path");
                };
                config_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: reminder-worker [--config <path>]");
                std::process::exit(0);
            }
            other => bail!("Unknown argument: {other}"),
        }
        i += 1;
    }

    Ok(config_path)
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = ctrl_c => result.context("Failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await.context("Failed to listen for Ctrl+C")?;

    info!("Shutdown signal received");
    Ok(())
}
