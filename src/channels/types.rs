//! Outbound delivery trait and types for AgentLine
//!
//! This module defines the `PushSender` trait the relay and router use to
//! talk back to a chat, along with the message type it carries. The LINE
//! Messaging API client implements it; tests substitute an in-memory recorder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single push message bound for one chat destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Destination id: a group id, room id or user id
    pub to: String,
    /// Message text (at most 5000 characters, never blank)
    pub text: String,
}

impl OutboundMessage {
    /// Creates a new outbound message.
    ///
    /// # Example
    ///
    /// ```
    /// use agentline::channels::OutboundMessage;
    ///
    /// let msg = OutboundMessage::new("U123", "こんにちは");
    /// assert_eq!(msg.to, "U123");
    /// assert_eq!(msg.text, "こんにちは");
    /// ```
    pub fn new(to: &str, text: &str) -> Self {
        Self {
            to: to.to_string(),
            text: text.to_string(),
        }
    }
}

/// The `PushSender` trait defines how replies reach a chat.
///
/// Implementations are responsible for:
/// - Delivering one push message per call, in call order
/// - Never delivering blank text
/// - Showing a "working on it" indicator in direct chats
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
/// use agentline::channels::{OutboundMessage, PushSender};
/// use agentline::error::Result;
///
/// struct StdoutSender;
///
/// #[async_trait]
/// impl PushSender for StdoutSender {
///     async fn push(&self, msg: OutboundMessage) -> Result<()> {
///         println!("{} <- {}", msg.to, msg.text);
///         Ok(())
///     }
///
///     async fn show_loading(&self, _chat_id: &str) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Sends one message to `msg.to`.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails (network failure, rejected token,
    /// invalid destination, rate limiting, etc.).
    async fn push(&self, msg: OutboundMessage) -> Result<()>;

    /// Shows the platform's loading animation in a one-to-one chat.
    ///
    /// Callers treat failures as cosmetic and only log them.
    async fn show_loading(&self, chat_id: &str) -> Result<()>;
}
