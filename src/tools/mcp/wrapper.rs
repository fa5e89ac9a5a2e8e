//! Adapts one remote MCP tool to the [`Tool`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::client::{McpClient, McpToolDef};
use crate::error::{AgentLineError, Result};
use crate::tools::{Tool, ToolContext};

/// Separator some servers use to namespace tool names (`aws___read_documentation`).
const NAMESPACE_SEPARATOR: &str = "___";

/// A remote MCP tool exposed to the agent under its local name.
pub struct McpToolWrapper {
    /// Name the model sees
    tool_name: String,
    /// Name on the server
    remote_name: String,
    description: String,
    input_schema: Value,
    client: Arc<McpClient>,
}

impl McpToolWrapper {
    /// Wrap `def`; the local name drops any server namespace prefix.
    pub fn new(def: McpToolDef, client: Arc<McpClient>) -> Self {
        Self {
            tool_name: local_name(&def.name).to_string(),
            description: def.description.unwrap_or_else(|| def.name.clone()),
            remote_name: def.name,
            input_schema: def.input_schema,
            client,
        }
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }
}

/// `aws___search_documentation` -> `search_documentation`.
pub fn local_name(remote: &str) -> &str {
    match remote.rsplit_once(NAMESPACE_SEPARATOR) {
        Some((_, name)) if !name.is_empty() => name,
        _ => remote,
    }
}

#[async_trait]
impl Tool for McpToolWrapper {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let result = self.client.call_tool(&self.remote_name, args).await?;
        let text = result.text();

        if result.is_error {
            return Err(AgentLineError::Mcp(if text.is_empty() {
                format!("{} on '{}' reported an error", self.remote_name, self.client.name())
            } else {
                text
            }));
        }
        Ok(if text.is_empty() {
            "(no output)".to_string()
        } else {
            text
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(name: &str, description: Option<&str>) -> McpToolDef {
        serde_json::from_value(json!({
            "name": name,
            "description": description,
            "inputSchema": {"type": "object", "properties": {"search_phrase": {"type": "string"}}}
        }))
        .unwrap()
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("aws___search_documentation"), "search_documentation");
        assert_eq!(local_name("recommend"), "recommend");
        assert_eq!(local_name("weird___"), "weird___");
    }

    #[test]
    fn test_wrapper_metadata() {
        let client = Arc::new(McpClient::new("docs", "http://127.0.0.1:1", 5));
        let wrapper = McpToolWrapper::new(
            def("aws___search_documentation", Some("Search AWS documentation")),
            client,
        );
        assert_eq!(wrapper.name(), "search_documentation");
        assert_eq!(wrapper.remote_name(), "aws___search_documentation");
        assert_eq!(wrapper.description(), "Search AWS documentation");
        assert_eq!(
            wrapper.parameters()["properties"]["search_phrase"]["type"],
            "string"
        );
    }

    #[test]
    fn test_missing_description_falls_back_to_name() {
        let client = Arc::new(McpClient::new("docs", "http://127.0.0.1:1", 5));
        let wrapper = McpToolWrapper::new(def("recommend", None), client);
        assert_eq!(wrapper.description(), "recommend");
    }
}
