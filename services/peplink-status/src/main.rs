//! Peplink status reporter
//!
//! Single-binary CLI that:
//! 1. Loads device settings (TOML file + env overlay for the client secret)
//! 2. Authenticates against the device API and keeps the token fresh
//! 3. Prints firmware version and WAN status as one JSON document
//! 4. Optionally repeats on an interval until SIGINT/SIGTERM

mod config;
mod report;

use anyhow::{Context, Result};
use peplink_api::Client;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::report::StatusReport;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the JSON reports.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    info!("starting peplink-status");

    let args: Vec<String> = std::env::args().collect();
    let config_path = Config::resolve_path(cli_config_path(&args));
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let client_config = config
        .client_config()
        .context("invalid device configuration")?;

    info!(
        base_url = %client_config.base_url,
        client_id = %client_config.client_id,
        poll_interval_secs = config.status.poll_interval_secs,
        "configuration loaded"
    );

    let client = Client::connect(&client_config)
        .await
        .context("failed to connect to device API")?;

    let outcome = match config.poll_interval() {
        None => print_report(&client).await,
        Some(interval) => poll(&client, interval).await,
    };

    client
        .shutdown()
        .await
        .context("failed to stop token renewal")?;
    info!("shutdown complete");
    outcome
}

/// `--config <path>` if present.
fn cli_config_path(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

async fn print_report(client: &Client) -> Result<()> {
    let report = StatusReport::collect(client)
        .await
        .context("failed to collect device status")?;
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

/// Print a report every `interval` until a shutdown signal arrives.
///
/// A failed poll is logged and the next tick tries again.
async fn poll(client: &Client, interval: Duration) -> Result<()> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    let mut renewal_warned = false;

    loop {
        tokio::select! {
            _ = &mut shutdown => return Ok(()),
            _ = ticker.tick() => {
                if let Err(e) = print_report(client).await {
                    warn!(error = %format!("{e:#}"), "status poll failed");
                }
                if !renewal_warned && !client.renewal_active() {
                    error!("token renewal has stopped; requests will fail once the current token expires");
                    renewal_warned = true;
                }
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
