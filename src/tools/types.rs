//! Tool types for AgentLine
//!
//! This module defines the `Tool` trait every agent tool implements and the
//! `ToolContext` passed to each execution.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A capability the agent can call during a turn.
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
/// use agentline::tools::{Tool, ToolContext};
/// use agentline::error::Result;
///
/// struct EchoTool;
///
/// #[async_trait]
/// impl Tool for EchoTool {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Echo the input back" }
///     fn parameters(&self) -> Value {
///         json!({"type": "object", "properties": {"text": {"type": "string"}}})
///     }
///     async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
///         Ok(args["text"].as_str().unwrap_or_default().to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name, as the model sees it.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters(&self) -> Value;

    /// Run the tool. The returned text is fed back to the model.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String>;
}

/// Per-call execution context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Agent session the call belongs to, when known
    pub session_id: Option<String>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }
}
