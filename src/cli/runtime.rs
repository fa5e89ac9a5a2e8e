//! `agentline runtime`: serve the agent runtime.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::common::{load_config_with_logging, shutdown_signal};

pub(crate) async fn cmd_runtime(config_path: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let mut config = load_config_with_logging(config_path)?;
    if let Some(port) = port {
        config.runtime.port = port;
    }

    println!(
        "Agent runtime on {}:{} (model {}). Press Ctrl+C to stop.",
        config.runtime.host, config.runtime.port, config.agent.model
    );

    agentline::runtime::server::serve(&config, shutdown_signal())
        .await
        .context("Agent runtime failed")?;

    println!("Shutting down...");
    Ok(())
}
