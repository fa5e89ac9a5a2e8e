//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod common;
pub mod config;
pub mod runtime;
pub mod webhook;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agentline")]
#[command(version)]
#[command(about = "LINE webhook bridge and streaming agent runtime", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.agentline/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the LINE webhook bridge
    Webhook {
        /// Override gateway.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Serve the agent runtime (POST /invocations)
    Runtime {
        /// Override runtime.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration with secrets masked
    Show,
    /// Report missing credentials for each server
    Check,
}

/// Entry point called from `main`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Version) => {
            cmd_version();
        }
        Some(Commands::Webhook { port }) => {
            webhook::cmd_webhook(config_path, port).await?;
        }
        Some(Commands::Runtime { port }) => {
            runtime::cmd_runtime(config_path, port).await?;
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(config_path, action)?;
        }
    }

    Ok(())
}

/// Display version information
fn cmd_version() {
    println!("agentline {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("LINE webhook bridge and streaming agent runtime");
}
