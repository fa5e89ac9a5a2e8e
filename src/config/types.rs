//! Configuration type definitions for AgentLine
//!
//! This module defines all configuration structs used by the webhook bridge
//! and the agent runtime. All types implement serde traits for JSON
//! serialization and have sensible defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration struct for AgentLine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// LINE Messaging API credentials and options
    pub line: LineConfig,
    /// Webhook gateway (inbound HTTP server) configuration
    pub gateway: GatewayConfig,
    /// Agent runtime endpoint (client side) and server binding
    pub runtime: RuntimeConfig,
    /// Stream relay texts and limits
    pub relay: RelayConfig,
    /// Agent session cache configuration
    pub session: SessionConfig,
    /// Agent model and loop configuration
    pub agent: AgentConfig,
    /// LLM provider configurations
    pub providers: ProvidersConfig,
    /// Tools configuration
    pub tools: ToolsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

// ============================================================================
// LINE Configuration
// ============================================================================

/// LINE Messaging API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Channel secret used to verify `x-line-signature`
    pub channel_secret: String,
    /// Long-lived channel access token used for push and loading calls
    pub channel_access_token: String,
    /// Messaging API base URL
    pub api_base: String,
    /// Seconds the loading animation stays visible in direct chats
    pub loading_seconds: u32,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            api_base: "https://api.line.me".to_string(),
            loading_seconds: 60,
        }
    }
}

// ============================================================================
// Gateway Configuration
// ============================================================================

/// Webhook gateway server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// URL path LINE posts webhook deliveries to
    pub path: String,
    /// How long a seen `webhookEventId` suppresses redeliveries
    pub dedupe_ttl_secs: u64,
    /// How long shutdown waits for in-flight batches before aborting them
    pub shutdown_grace_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/webhook".to_string(),
            dedupe_ttl_secs: 600,
            shutdown_grace_secs: 30,
        }
    }
}

// ============================================================================
// Runtime Configuration
// ============================================================================

/// Agent runtime configuration.
///
/// `url` and `timeout_secs` are used by the webhook bridge when invoking the
/// runtime; `host` and `port` bind the runtime server itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Base URL of the agent runtime (`/invocations` is appended)
    pub url: String,
    /// Total request timeout for one streamed turn
    pub timeout_secs: u64,
    /// Host the runtime server binds to
    pub host: String,
    /// Port the runtime server listens on
    pub port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8081".to_string(),
            timeout_secs: 120,
            host: "127.0.0.1".to_string(),
            port: 8081,
        }
    }
}

// ============================================================================
// Relay Configuration
// ============================================================================

/// Stream relay configuration: user-visible texts and the message size limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum characters per push message (LINE limit is 5000)
    pub max_message_chars: usize,
    /// Text pushed to group/room chats while the agent works
    pub thinking_notice: String,
    /// Single fixed text pushed when a turn fails
    pub failure_notice: String,
    /// Template for unknown tool names; `{tool}` is replaced with the name
    pub status_fallback: String,
    /// Additional or overriding tool status texts keyed by tool name
    pub tool_status: HashMap<String, String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 5000,
            thinking_notice: "考えています...".to_string(),
            failure_notice: "エラーが発生しました。もう一度お試しください。".to_string(),
            status_fallback: "{tool} を実行しています...".to_string(),
            tool_status: HashMap::new(),
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Agent session cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle lifetime of a session's agent handle
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_secs: 15 * 60 }
    }
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Default system prompt for the LINE assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "あなたはLINEで動くアシスタントです。
ユーザーからの質問や依頼に応じて、ツールを活用しながら柔軟に対応します。

## 利用可能なツール
- current_time: 現在のUTC時刻を取得（JST = UTC+9 に変換して使用）
- web_search: ウェブ検索で最新情報を取得
- rss: RSSフィードを取得（url を省略するとAWSの最新アップデートのフィードを取得）
- search_documentation: AWSの公式ドキュメントを検索
- read_documentation: AWSドキュメントのページを読み取り

## 対応方針
- AWSの最新アップデートやWhat's Newについて聞かれたら rss ツールを使う（web_searchより優先）
- AWSサービスについての質問は search_documentation と read_documentation で対応
- 最新のニュースや調べ物は web_search で対応
- 日時に関する質問は current_time で現在時刻を確認

## 応答ルール
- 最終回答はスマホで読みやすいよう箇条書きでコンパクトに
- 1メッセージは200文字以内を目安にする
- Markdownは使わない（LINEではレンダリングされないため）
- このチャットは会話履歴を保持しています。前の会話の文脈を踏まえて自然に応答してください
";

/// Agent model and loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier passed to the provider
    pub model: String,
    /// Maximum tokens per model response
    pub max_tokens: u32,
    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,
    /// Maximum model round-trips per turn when tools are called
    pub max_tool_iterations: usize,
    /// System prompt for every agent
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 8192,
            temperature: None,
            max_tool_iterations: 10,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// LLM providers configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Anthropic (Claude) configuration
    pub anthropic: Option<ProviderConfig>,
}

/// Generic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key
    pub api_key: Option<String>,
    /// Base URL override (e.g. a proxy)
    pub api_base: Option<String>,
}

// ============================================================================
// Tools Configuration
// ============================================================================

/// Tools configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ToolsConfig {
    /// Web search configuration
    pub web_search: WebSearchConfig,
    /// Feed reader configuration
    pub rss: RssConfig,
    /// Documentation MCP server configuration
    pub docs: DocsMcpConfig,
}

/// AWS What's New feed (Japanese edition)
pub const DEFAULT_FEED_URL: &str = "https://aws.amazon.com/jp/about-aws/whats-new/recent/feed/";

/// Feed reader (`rss` tool) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RssConfig {
    /// Register the `rss` tool
    pub enabled: bool,
    /// Feed fetched when the model does not pass a `url`
    pub default_url: String,
    /// Entries returned when the model does not pass `max_entries`
    pub max_entries: usize,
    /// HTTP timeout for one fetch
    pub timeout_secs: u64,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_url: DEFAULT_FEED_URL.to_string(),
            max_entries: 10,
            timeout_secs: 30,
        }
    }
}

/// Remote documentation MCP server whose tools are exposed to the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsMcpConfig {
    /// Connect at runtime startup and register the server's tools
    pub enabled: bool,
    /// Streamable HTTP endpoint of the server
    pub url: String,
    /// HTTP timeout for one JSON-RPC request
    pub timeout_secs: u64,
}

impl Default for DocsMcpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://knowledge-mcp.global.api.aws".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Web search (Tavily) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Tavily API key; the tool is not registered without one
    pub api_key: Option<String>,
    /// Maximum search results to return
    pub max_results: u32,
    /// Tavily search depth ("basic" or "advanced")
    pub search_depth: String,
    /// Ask Tavily for a generated summary answer
    pub include_answer: bool,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: 5,
            search_depth: "basic".to_string(),
            include_answer: true,
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, coloured
    Pretty,
    /// Compact `target message {fields}` lines
    #[default]
    Component,
    /// Structured JSON lines
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Optional file to append JSON logs to
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "info".to_string(),
            file: None,
        }
    }
}
