//! Agent runtime: the HTTP boundary between the webhook bridge and the agent.
//!
//! The bridge side uses [`AgentRuntime`] (implemented over HTTP by
//! [`HttpAgentRuntime`]) to start a turn and receive the response as a stream
//! of SSE lines. The [`server`] module is the other end: it hosts the
//! session-scoped agents and streams each turn as Converse-style events.
//!
//! ```text
//!  webhook bridge                          agent runtime
//! ┌──────────────────┐  POST /invocations ┌──────────────────┐
//! │ HttpAgentRuntime │──────────────────>│ server::router   │
//! │                  │<──────────────────│  SessionRegistry │
//! └──────────────────┘  data: {"event"..} │  └─ Agent        │
//!                       data: [DONE]      └──────────────────┘
//! ```

mod client;
pub mod server;

use serde::{Deserialize, Serialize};

pub use client::{decode_lines, AgentRuntime, HttpAgentRuntime, LineStream};

/// Body of `POST /invocations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// User text for this turn
    #[serde(default)]
    pub prompt: String,
    /// Conversation the turn belongs to; a fresh agent is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_request_defaults() {
        let request: InvocationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.prompt, "");
        assert!(request.session_id.is_none());
    }

    #[test]
    fn test_invocation_request_omits_missing_session() {
        let request = InvocationRequest {
            prompt: "hi".to_string(),
            session_id: None,
        };
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"prompt":"hi"}"#);
    }
}
