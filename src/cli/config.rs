//! Config inspection command handler.

use std::path::PathBuf;

use anyhow::{Context, Result};

use agentline::config::Config;

use super::common::load_config;
use super::ConfigAction;

pub(crate) fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    let shown_path = config_path.clone().unwrap_or_else(Config::path);
    let config = load_config(config_path)?;

    match action {
        ConfigAction::Show => {
            let json = serde_json::to_string_pretty(&config.redacted())
                .context("Failed to serialize config")?;
            println!("{}", json);
        }
        ConfigAction::Check => {
            println!("Config file: {}", shown_path.display());
            if !shown_path.exists() {
                println!("[OK] No config file found (using defaults and environment)");
            }
            report("webhook", config.validate_webhook());
            report("runtime", config.validate_runtime());
        }
    }
    Ok(())
}

fn report(server: &str, result: agentline::Result<()>) {
    match result {
        Ok(()) => println!("[OK] {} is ready to serve", server),
        Err(e) => println!("[ERROR] {}: {}", server, e),
    }
}
