//! Error types for AgentLine
//!
//! This module defines all error types used throughout the bridge and the
//! agent runtime. Uses `thiserror` for ergonomic error handling with automatic
//! `Display` and `Error` trait implementations.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured provider error classification.
///
/// Categorizes LLM provider HTTP errors so logs and agent failures carry the
/// cause without string matching.
#[derive(Debug)]
pub enum ProviderError {
    /// 401: Invalid API key or authentication failure
    Auth(String),
    /// 429: Rate limit or quota exceeded
    RateLimit(String),
    /// 402: Payment required or billing issue
    Billing(String),
    /// 500/502/503/504: Server-side errors
    ServerError(String),
    /// 400: Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 404: Model not found or endpoint not available
    ModelNotFound(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ProviderError::Billing(msg) => write!(f, "Billing error: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::ModelNotFound(msg) => write!(f, "Model not found: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "Unknown provider error: {}", msg),
        }
    }
}

impl From<ProviderError> for AgentLineError {
    fn from(err: ProviderError) -> Self {
        AgentLineError::ProviderTyped(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for AgentLine operations.
#[derive(Error, Debug)]
pub enum AgentLineError {
    /// Configuration-related errors (invalid config, missing credentials, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors (stream failures, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured provider error classified from an HTTP status.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// Chat platform errors (push delivery, malformed webhook bodies, etc.)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Agent runtime errors (invocation failures, broken response streams)
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Tool execution errors (invalid parameters, execution failures, etc.)
    #[error("Tool error: {0}")]
    Tool(String),

    /// MCP server errors (handshake, JSON-RPC errors, tool-reported failures)
    #[error("MCP error: {0}")]
    Mcp(String),

    /// Agent session errors (turn failures, exhausted tool iterations)
    #[error("Session error: {0}")]
    Session(String),

    /// Webhook signature verification failures
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for AgentLine operations.
pub type Result<T> = std::result::Result<T, AgentLineError>;
