//! Shared helpers for CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use agentline::config::Config;
use agentline::utils::logging::init_logging;

/// Load config from `path` or the default location.
pub(crate) fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load()
            .with_context(|| format!("Failed to load config from {}", Config::path().display())),
    }
}

/// Load config and install the tracing subscriber it describes.
pub(crate) fn load_config_with_logging(path: Option<PathBuf>) -> Result<Config> {
    let config = load_config(path)?;
    init_logging(&config.logging).context("Failed to initialize logging")?;
    Ok(config)
}

/// Resolves on Ctrl+C or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    info!("Shutdown signal received");
}
