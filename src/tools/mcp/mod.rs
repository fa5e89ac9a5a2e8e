//! Remote MCP servers as tool sources.
//!
//! At runtime startup the documentation server is asked for its tool list and
//! every tool is registered as an [`McpToolWrapper`]. A server that cannot be
//! reached only costs its tools; the runtime still starts.

mod client;
mod wrapper;

pub use client::{McpClient, McpToolDef, ToolCallResult, ToolContent, PROTOCOL_VERSION};
pub use wrapper::{local_name, McpToolWrapper};

use std::sync::Arc;

use tracing::{info, warn};

use crate::tools::types::Tool;

use super::ToolRegistry;
use crate::config::DocsMcpConfig;
use crate::error::Result;

/// Connect to `url` and register its tools, skipping names already taken.
///
/// Returns the number of tools added.
pub async fn register_server_tools(
    registry: &mut ToolRegistry,
    server: &str,
    url: &str,
    timeout_secs: u64,
) -> Result<usize> {
    let client = Arc::new(McpClient::connect(server, url, timeout_secs).await?);
    let mut added = 0;

    for def in client.list_tools().await? {
        let wrapper = McpToolWrapper::new(def, Arc::clone(&client));
        if registry.has(wrapper.name()) {
            warn!(
                server,
                tool = wrapper.name(),
                remote = wrapper.remote_name(),
                "MCP tool name already registered, skipping"
            );
            continue;
        }
        registry.register(Box::new(wrapper));
        added += 1;
    }

    info!(server, url, tools = added, "Registered MCP server tools");
    Ok(added)
}

/// Register the documentation server's tools when enabled; failures are logged.
pub async fn register_docs_tools(registry: &mut ToolRegistry, config: &DocsMcpConfig) -> usize {
    if !config.enabled {
        return 0;
    }
    match register_server_tools(registry, "docs", &config.url, config.timeout_secs).await {
        Ok(added) => added,
        Err(e) => {
            warn!(url = %config.url, error = %e, "Documentation MCP server unavailable, its tools are disabled");
            0
        }
    }
}
