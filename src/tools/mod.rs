//! Tools module - capabilities the agent can call during a turn
//!
//! - `current_time`: current time in UTC or a fixed offset
//! - `web_search`: Tavily web search (registered only with an API key)
//! - `rss`: RSS/Atom feed reader, defaulting to the AWS What's New feed
//! - documentation tools (`search_documentation`, `read_documentation`, ...)
//!   discovered from a remote MCP server at runtime startup

pub mod mcp;
mod registry;
pub mod rss;
pub mod time;
mod types;
pub mod web;

pub use registry::ToolRegistry;
pub use rss::RssTool;
pub use time::CurrentTimeTool;
pub use types::{Tool, ToolContext};
pub use web::WebSearchTool;

use crate::config::ToolsConfig;

/// Registry with every local tool the configuration enables.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CurrentTimeTool));
    match WebSearchTool::from_config(&config.web_search) {
        Some(tool) => registry.register(Box::new(tool)),
        None => tracing::warn!("TAVILY_API_KEY not set, web_search tool disabled"),
    }
    if let Some(tool) = RssTool::from_config(&config.rss) {
        registry.register(Box::new(tool));
    }
    registry
}

/// Local tools plus the tools of the configured MCP servers.
pub async fn runtime_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = default_registry(config);
    mcp::register_docs_tools(&mut registry, &config.docs).await;
    registry
}
