//! JSON-RPC client for remote MCP servers over the streamable HTTP transport.
//!
//! Every request is a POST; the server answers either with a JSON body or a
//! short `text/event-stream` carrying the response. The session id the server
//! assigns during `initialize` is echoed on every later request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AgentLineError, Result};

/// MCP protocol revision sent during the handshake.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

const SESSION_ID_HEADER: &str = "Mcp-Session-Id";
const PROTOCOL_VERSION_HEADER: &str = "MCP-Protocol-Version";
const STREAMABLE_ACCEPT: &str = "application/json, text/event-stream";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A tool advertised by `tools/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[derive(Debug, Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<McpToolDef>,
}

/// One content block of a `tools/call` result.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Text blocks joined with newlines; other block types are skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ToolContent::Text { text } => Some(text.as_str()),
                ToolContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Client for one MCP server.
pub struct McpClient {
    name: String,
    url: String,
    client: Client,
    next_id: AtomicU64,
    session_id: RwLock<Option<String>>,
}

impl McpClient {
    /// Create a client without contacting the server.
    pub fn new(name: &str, url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            name: name.to_string(),
            url: url.to_string(),
            client,
            next_id: AtomicU64::new(1),
            session_id: RwLock::new(None),
        }
    }

    /// Create a client and complete the `initialize` handshake.
    pub async fn connect(name: &str, url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Self::new(name, url, timeout_secs);
        client.initialize().await?;
        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "agentline",
                "version": env!("CARGO_PKG_VERSION"),
            }
        });
        let result = self.request("initialize", Some(params)).await?;

        info!(
            server = %self.name,
            protocol = result.get("protocolVersion").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
            server_name = result
                .pointer("/serverInfo/name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown"),
            "MCP server initialized"
        );

        self.notify("notifications/initialized").await
    }

    /// Fetch the server's tool list.
    pub async fn list_tools(&self) -> Result<Vec<McpToolDef>> {
        let result = self.request("tools/list", None).await?;
        let list: ToolsListResult = serde_json::from_value(result)?;
        debug!(server = %self.name, count = list.tools.len(), "Fetched MCP tools");
        Ok(list.tools)
    }

    /// Call a tool by its server-side name.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn post(&self, body: &JsonRpcRequest<'_>) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Accept", STREAMABLE_ACCEPT)
            .header(PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION)
            .json(body);
        if let Some(session_id) = self.session_id.read().await.clone() {
            request = request.header(SESSION_ID_HEADER, session_id);
        }

        let response = request.send().await.map_err(|e| {
            AgentLineError::Mcp(format!("{} request to '{}' failed: {}", body.method, self.name, e))
        })?;

        if let Some(session_id) = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
        {
            let mut slot = self.session_id.write().await;
            if slot.as_deref() != Some(session_id) {
                debug!(server = %self.name, session_id, "MCP session id assigned");
                *slot = Some(session_id.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentLineError::Mcp(format!(
                "{} on '{}' returned HTTP {}: {}",
                body.method,
                self.name,
                status,
                detail.trim()
            )));
        }
        Ok(response)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        };

        let response = self.post(&body).await?;
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|base| base.trim() == "text/event-stream");
        let text = response.text().await.map_err(|e| {
            AgentLineError::Mcp(format!("{} response from '{}' unreadable: {}", method, self.name, e))
        })?;

        let parsed = if is_event_stream {
            parse_event_stream(&text, method)?
        } else {
            serde_json::from_str::<JsonRpcResponse>(&text)?
        };

        if let Some(error) = parsed.error {
            return Err(AgentLineError::Mcp(format!(
                "{} on '{}' failed ({}): {}",
                method, self.name, error.code, error.message
            )));
        }
        parsed
            .result
            .ok_or_else(|| AgentLineError::Mcp(format!("{} on '{}' returned no result", method, self.name)))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: None,
        };
        self.post(&body).await.map(|_| ())
    }
}

/// First JSON-RPC response carried by an SSE body.
fn parse_event_stream(body: &str, method: &str) -> Result<JsonRpcResponse> {
    let mut data = String::new();
    let try_parse = |data: &mut String| {
        let parsed = serde_json::from_str::<Value>(data)
            .ok()
            .filter(|v| v.get("result").is_some() || v.get("error").is_some())
            .and_then(|v| serde_json::from_value::<JsonRpcResponse>(v).ok());
        data.clear();
        parsed
    };

    for line in body.lines() {
        let line = line.trim_end();
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
        } else if line.is_empty() && !data.is_empty() {
            if let Some(response) = try_parse(&mut data) {
                return Ok(response);
            }
        }
    }
    if !data.is_empty() {
        if let Some(response) = try_parse(&mut data) {
            return Ok(response);
        }
    }

    Err(AgentLineError::Mcp(format!(
        "no JSON-RPC response in event stream for '{}'",
        method
    )))
}
