//! `agentline webhook`: serve the LINE webhook bridge.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::common::{load_config_with_logging, shutdown_signal};

pub(crate) async fn cmd_webhook(config_path: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let mut config = load_config_with_logging(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    println!(
        "Webhook bridge on {}:{}{} -> {}. Press Ctrl+C to stop.",
        config.gateway.host, config.gateway.port, config.gateway.path, config.runtime.url
    );

    agentline::gateway::serve(&config, shutdown_signal())
        .await
        .context("Webhook gateway failed")?;

    println!("Shutting down...");
    Ok(())
}
