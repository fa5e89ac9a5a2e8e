//! Providers module - LLM providers
//!
//! This module defines the `LLMProvider` trait and common types for streaming
//! model responses. `ClaudeProvider` implements it for the Anthropic Messages API.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentline::providers::{ChatOptions, ClaudeProvider, LLMProvider, StreamEvent};
//! use agentline::session::Message;
//!
//! async fn example() {
//!     let provider = ClaudeProvider::new("your-api-key");
//!     let messages = vec![Message::user("こんにちは")];
//!     let mut rx = provider
//!         .chat_stream(messages, vec![], None, ChatOptions::new().with_max_tokens(1000))
//!         .await
//!         .unwrap();
//!
//!     while let Some(event) = rx.recv().await {
//!         if let StreamEvent::Delta(text) = event {
//!             print!("{}", text);
//!         }
//!     }
//! }
//! ```

pub mod claude;
#[cfg(test)]
pub(crate) mod testing;
mod types;

use crate::error::ProviderError;

pub use claude::ClaudeProvider;
pub use types::{ChatOptions, LLMProvider, LLMToolCall, StreamEvent, ToolDefinition, Usage};

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 => ProviderError::Auth(body.to_string()),
        402 => ProviderError::Billing(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 => ProviderError::InvalidRequest(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}
