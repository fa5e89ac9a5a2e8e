//! Claude (Anthropic) LLM provider implementation
//!
//! This module implements the `LLMProvider` trait for Anthropic's Messages API
//! with server-sent event streaming. Message conversion and the stream parser
//! are plain functions so they can be tested without the network.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{AgentLineError, Result};
use crate::runtime::decode_lines;
use crate::session::{Message, Role};

use super::{parse_provider_error, ChatOptions, LLMProvider, LLMToolCall, StreamEvent, ToolDefinition, Usage};

/// The Anthropic API base URL.
const CLAUDE_API_BASE: &str = "https://api.anthropic.com";

/// The default Claude model to use.
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// The Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default `max_tokens` when the caller does not set one.
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Claude/Anthropic LLM provider.
pub struct ClaudeProvider {
    /// API key for authentication
    api_key: String,
    /// Base URL (`/v1/messages` is appended)
    api_base: String,
    /// HTTP client for making requests
    client: Client,
}

impl ClaudeProvider {
    /// Create a new Claude provider with the given API key.
    ///
    /// # Example
    /// ```
    /// use agentline::providers::{ClaudeProvider, LLMProvider};
    ///
    /// let provider = ClaudeProvider::new("sk-ant-api03-xxx");
    /// assert_eq!(provider.name(), "claude");
    /// ```
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: CLAUDE_API_BASE.to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Create a new Claude provider with a custom HTTP client.
    pub fn with_client(api_key: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: CLAUDE_API_BASE.to_string(),
            client,
        }
    }

    /// Point the provider at a different base URL (proxy or test server).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }
}

#[async_trait]
impl LLMProvider for ClaudeProvider {
    async fn chat_stream(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let model = model.unwrap_or(DEFAULT_MODEL);
        let (system, claude_messages) = convert_messages(messages);

        let request = ClaudeRequest {
            model: model.to_string(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: claude_messages,
            system,
            tools: if tools.is_empty() {
                None
            } else {
                Some(convert_tools(tools))
            },
            temperature: options.temperature,
            stream: true,
        };

        debug!(model = %model, messages = request.messages.len(), "Starting Claude stream");

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let body = match serde_json::from_str::<ClaudeErrorResponse>(&error_text) {
                Ok(parsed) => format!(
                    "Claude API error: {} - {}",
                    parsed.error.r#type, parsed.error.message
                ),
                Err(_) => format!("Claude API error: {}", error_text),
            };
            return Err(AgentLineError::from(parse_provider_error(status, &body)));
        }

        let (tx, rx) = mpsc::channel::<StreamEvent>(32);
        let mut lines = decode_lines(response.bytes_stream());

        tokio::spawn(async move {
            let mut parser = ClaudeStreamParser::new();

            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        let _ = tx
                            .send(StreamEvent::Error(AgentLineError::Provider(format!(
                                "Stream read error: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                };

                for event in parser.feed_line(&line) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                if parser.is_finished() {
                    return;
                }
            }

            for event in parser.finish() {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn name(&self) -> &str {
        "claude"
    }
}

// ============================================================================
// Stream Parser
// ============================================================================

/// Incremental parser for the Messages API event stream.
///
/// Fed one SSE line at a time, it turns Anthropic events into [`StreamEvent`]s,
/// assembling text and tool-call arguments along the way.
#[derive(Debug, Default)]
pub(crate) struct ClaudeStreamParser {
    assembled: String,
    tool_calls: Vec<LLMToolCall>,
    current_tool: Option<(String, String)>,
    current_tool_json: String,
    input_tokens: u32,
    output_tokens: u32,
    finished: bool,
}

impl ClaudeStreamParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// True once `message_stop` or an error event has been seen.
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consume one raw SSE line.
    pub(crate) fn feed_line(&mut self, line: &str) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with("event:") || line.starts_with(':') {
            return Vec::new();
        }
        let Some(data) = line.strip_prefix("data:") else {
            return Vec::new();
        };
        let data = data.trim();
        if data == "[DONE]" {
            return self.complete();
        }

        let sse: SseEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable Claude stream event");
                return Vec::new();
            }
        };

        match sse.event_type.as_str() {
            "message_start" => {
                if let Some(usage) = sse.message.and_then(|m| m.usage) {
                    self.input_tokens = usage.input_tokens.unwrap_or(0);
                }
                Vec::new()
            }
            "content_block_start" => match sse.content_block {
                Some(block) if block.block_type == "tool_use" => {
                    let id = block.id.unwrap_or_default();
                    let name = block.name.unwrap_or_default();
                    self.current_tool = Some((id.clone(), name.clone()));
                    self.current_tool_json.clear();
                    vec![StreamEvent::ToolUseStart { id, name }]
                }
                _ => Vec::new(),
            },
            "content_block_delta" => {
                let Some(delta) = sse.delta else {
                    return Vec::new();
                };
                match delta.delta_type.as_deref() {
                    Some("text_delta") => match delta.text {
                        Some(text) if !text.is_empty() => {
                            self.assembled.push_str(&text);
                            vec![StreamEvent::Delta(text)]
                        }
                        _ => Vec::new(),
                    },
                    Some("input_json_delta") => {
                        if let Some(chunk) = delta.partial_json {
                            self.current_tool_json.push_str(&chunk);
                        }
                        Vec::new()
                    }
                    _ => Vec::new(),
                }
            }
            "content_block_stop" => {
                if let Some((id, name)) = self.current_tool.take() {
                    let args = if self.current_tool_json.is_empty() {
                        "{}".to_string()
                    } else {
                        std::mem::take(&mut self.current_tool_json)
                    };
                    self.tool_calls.push(LLMToolCall::new(&id, &name, &args));
                }
                vec![StreamEvent::BlockStop]
            }
            "message_delta" => {
                if let Some(usage) = sse.usage {
                    self.output_tokens = usage.output_tokens.unwrap_or(self.output_tokens);
                }
                Vec::new()
            }
            "message_stop" => self.complete(),
            "error" => {
                self.finished = true;
                let message = sse
                    .error
                    .map(|e| format!("{} - {}", e.r#type, e.message))
                    .unwrap_or_else(|| "unknown stream error".to_string());
                vec![StreamEvent::Error(AgentLineError::Provider(format!(
                    "Claude stream error: {}",
                    message
                )))]
            }
            _ => Vec::new(),
        }
    }

    /// Flush at end of input. A stream cut before `message_stop` still
    /// reports what was assembled.
    pub(crate) fn finish(mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.complete()
    }

    fn complete(&mut self) -> Vec<StreamEvent> {
        self.finished = true;
        let mut events = Vec::new();
        if !self.tool_calls.is_empty() {
            events.push(StreamEvent::ToolCalls(std::mem::take(&mut self.tool_calls)));
        }
        events.push(StreamEvent::Done {
            content: std::mem::take(&mut self.assembled),
            usage: Some(Usage::new(self.input_tokens, self.output_tokens)),
        });
        events
    }
}

// ============================================================================
// Claude API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    /// Conversation messages (excluding system)
    messages: Vec<ClaudeMessage>,
    /// System prompt (separate from messages in Claude API)
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ClaudeTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ClaudeMessage {
    /// "user" or "assistant"
    role: String,
    content: ClaudeContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum ClaudeContent {
    Text(String),
    Blocks(Vec<ClaudeContentBlock>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ClaudeContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

// ============================================================================
// Claude API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
    error: ClaudeError,
}

#[derive(Debug, Deserialize)]
struct ClaudeError {
    r#type: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SseEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<SseDelta>,
    #[serde(default)]
    content_block: Option<SseContentBlock>,
    #[serde(default)]
    usage: Option<SseUsage>,
    #[serde(default)]
    message: Option<SseMessage>,
    #[serde(default)]
    error: Option<ClaudeError>,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(rename = "type", default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseUsage {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SseMessage {
    #[serde(default)]
    usage: Option<SseUsage>,
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn flush_tool_results(pending: &mut Vec<ClaudeContentBlock>, out: &mut Vec<ClaudeMessage>) {
    if !pending.is_empty() {
        out.push(ClaudeMessage {
            role: "user".to_string(),
            content: ClaudeContent::Blocks(std::mem::take(pending)),
        });
    }
}

/// Convert session messages to Claude API format.
///
/// The system message moves to the separate `system` field and consecutive
/// tool results are grouped into one user message.
fn convert_messages(messages: Vec<Message>) -> (Option<String>, Vec<ClaudeMessage>) {
    let mut system: Option<String> = None;
    let mut claude_messages: Vec<ClaudeMessage> = Vec::new();
    let mut pending_tool_results: Vec<ClaudeContentBlock> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => {
                system = Some(msg.content);
            }
            Role::User => {
                flush_tool_results(&mut pending_tool_results, &mut claude_messages);
                claude_messages.push(ClaudeMessage {
                    role: "user".to_string(),
                    content: ClaudeContent::Text(msg.content),
                });
            }
            Role::Assistant => {
                flush_tool_results(&mut pending_tool_results, &mut claude_messages);
                match msg.tool_calls {
                    Some(tool_calls) if !tool_calls.is_empty() => {
                        let mut blocks: Vec<ClaudeContentBlock> = Vec::new();
                        if !msg.content.is_empty() {
                            blocks.push(ClaudeContentBlock::Text { text: msg.content });
                        }
                        for tc in tool_calls {
                            let input: serde_json::Value = serde_json::from_str(&tc.arguments)
                                .unwrap_or_else(|_| serde_json::json!({}));
                            blocks.push(ClaudeContentBlock::ToolUse {
                                id: tc.id,
                                name: tc.name,
                                input,
                            });
                        }
                        claude_messages.push(ClaudeMessage {
                            role: "assistant".to_string(),
                            content: ClaudeContent::Blocks(blocks),
                        });
                    }
                    _ => {
                        claude_messages.push(ClaudeMessage {
                            role: "assistant".to_string(),
                            content: ClaudeContent::Text(msg.content),
                        });
                    }
                }
            }
            Role::Tool => {
                if let Some(tool_call_id) = msg.tool_call_id {
                    pending_tool_results.push(ClaudeContentBlock::ToolResult {
                        tool_use_id: tool_call_id,
                        content: msg.content,
                    });
                }
            }
        }
    }

    flush_tool_results(&mut pending_tool_results, &mut claude_messages);
    (system, claude_messages)
}

fn convert_tools(tools: Vec<ToolDefinition>) -> Vec<ClaudeTool> {
    tools
        .into_iter()
        .map(|t| ClaudeTool {
            name: t.name,
            description: t.description,
            input_schema: t.parameters,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ToolCall;
    use axum::{http::HeaderMap, routing::post, Router};

    fn feed_all(parser: &mut ClaudeStreamParser, lines: &[&str]) -> Vec<StreamEvent> {
        lines.iter().flat_map(|l| parser.feed_line(l)).collect()
    }

    #[test]
    fn test_claude_provider_creation() {
        let provider = ClaudeProvider::new("test-key");
        assert_eq!(provider.name(), "claude");
        assert_eq!(provider.default_model(), "claude-sonnet-4-5-20250929");
        assert_eq!(provider.messages_url(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_with_api_base_trims_trailing_slash() {
        let provider = ClaudeProvider::new("k").with_api_base("http://proxy.local/");
        assert_eq!(provider.messages_url(), "http://proxy.local/v1/messages");
    }

    #[test]
    fn test_message_conversion_with_system() {
        let messages = vec![Message::system("指示"), Message::user("こんにちは")];
        let (system, converted) = convert_messages(messages);
        assert_eq!(system.as_deref(), Some("指示"));
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, "user");
    }

    #[test]
    fn test_message_conversion_with_tool_calls() {
        let messages = vec![
            Message::user("東京の天気"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("toolu_1", "web_search", r#"{"query":"東京 天気"}"#)],
            ),
            Message::tool_result("toolu_1", "晴れ"),
            Message::assistant("晴れです"),
        ];
        let (system, converted) = convert_messages(messages);
        assert!(system.is_none());
        assert_eq!(converted.len(), 4);

        let json = serde_json::to_value(&converted).unwrap();
        assert_eq!(json[1]["content"][0]["type"], "tool_use");
        assert_eq!(json[1]["content"][0]["input"]["query"], "東京 天気");
        assert_eq!(json[2]["role"], "user");
        assert_eq!(json[2]["content"][0]["type"], "tool_result");
        assert_eq!(json[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(json[3]["content"], "晴れです");
    }

    #[test]
    fn test_consecutive_tool_results_grouped() {
        let messages = vec![
            Message::assistant_with_tools(
                "",
                vec![
                    ToolCall::new("a", "current_time", "{}"),
                    ToolCall::new("b", "web_search", r#"{"query":"x"}"#),
                ],
            ),
            Message::tool_result("a", "now"),
            Message::tool_result("b", "found"),
        ];
        let (_, converted) = convert_messages(messages);
        assert_eq!(converted.len(), 2);
        match &converted[1].content {
            ClaudeContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            other => panic!("expected blocks, got {:?}", other),
        }
    }

    #[test]
    fn test_request_serialization_omits_empty_options() {
        let request = ClaudeRequest {
            model: "m".to_string(),
            max_tokens: 10,
            messages: vec![],
            system: None,
            tools: None,
            temperature: None,
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert!(json.get("system").is_none());
        assert!(json.get("tools").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_parser_text_stream() {
        let mut parser = ClaudeStreamParser::new();
        let events = feed_all(
            &mut parser,
            &[
                "event: message_start",
                r#"data: {"type":"message_start","message":{"usage":{"input_tokens":12}}}"#,
                r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"こん"}}"#,
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"にちは"}}"#,
                r#"data: {"type":"content_block_stop","index":0}"#,
                r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":5}}"#,
                r#"data: {"type":"message_stop"}"#,
            ],
        );
        assert!(parser.is_finished());
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], StreamEvent::Delta(t) if t == "こん"));
        assert!(matches!(&events[1], StreamEvent::Delta(t) if t == "にちは"));
        assert!(matches!(events[2], StreamEvent::BlockStop));
        match &events[3] {
            StreamEvent::Done { content, usage } => {
                assert_eq!(content, "こんにちは");
                assert_eq!(*usage, Some(Usage::new(12, 5)));
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_tool_use_stream() {
        let mut parser = ClaudeStreamParser::new();
        let events = feed_all(
            &mut parser,
            &[
                r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_9","name":"web_search","input":{}}}"#,
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"query\":"}}"#,
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"\"rust\"}"}}"#,
                r#"data: {"type":"content_block_stop","index":0}"#,
                r#"data: {"type":"message_stop"}"#,
            ],
        );
        assert!(matches!(&events[0], StreamEvent::ToolUseStart { id, name } if id == "toolu_9" && name == "web_search"));
        assert!(matches!(events[1], StreamEvent::BlockStop));
        match &events[2] {
            StreamEvent::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].arguments_value()["query"], "rust");
            }
            other => panic!("expected ToolCalls, got {:?}", other),
        }
        assert!(matches!(events[3], StreamEvent::Done { .. }));
    }

    #[test]
    fn test_parser_tool_without_input_gets_empty_object() {
        let mut parser = ClaudeStreamParser::new();
        let events = feed_all(
            &mut parser,
            &[
                r#"data: {"type":"content_block_start","content_block":{"type":"tool_use","id":"t","name":"current_time"}}"#,
                r#"data: {"type":"content_block_stop"}"#,
            ],
        );
        assert_eq!(events.len(), 2);
        let tail = parser.finish();
        match &tail[0] {
            StreamEvent::ToolCalls(calls) => assert_eq!(calls[0].arguments, "{}"),
            other => panic!("expected ToolCalls, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_error_event() {
        let mut parser = ClaudeStreamParser::new();
        let events = parser.feed_line(
            r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        );
        assert!(parser.is_finished());
        match &events[0] {
            StreamEvent::Error(e) => assert!(e.to_string().contains("overloaded_error")),
            other => panic!("expected Error, got {:?}", other),
        }
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_parser_ignores_garbage_and_pings() {
        let mut parser = ClaudeStreamParser::new();
        assert!(parser.feed_line("data: {not json").is_empty());
        assert!(parser.feed_line(r#"data: {"type":"ping"}"#).is_empty());
        assert!(parser.feed_line(": comment").is_empty());
        assert!(!parser.is_finished());
    }

    #[tokio::test]
    async fn test_chat_stream_against_local_server() {
        async fn handler(headers: HeaderMap, body: String) -> String {
            assert_eq!(headers["x-api-key"], "test-key");
            let request: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(request["stream"], true);
            assert_eq!(request["system"], "be brief");
            [
                "event: content_block_start",
                r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
                "",
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#,
                "",
                r#"data: {"type":"content_block_stop","index":0}"#,
                "",
                r#"data: {"type":"message_stop"}"#,
                "",
            ]
            .join("\n")
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/v1/messages", post(handler));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let provider =
            ClaudeProvider::new("test-key").with_api_base(&format!("http://{}", addr));
        let mut rx = provider
            .chat_stream(
                vec![Message::system("be brief"), Message::user("hello")],
                vec![],
                None,
                ChatOptions::new(),
            )
            .await
            .unwrap();

        let mut text = String::new();
        let mut done = false;
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Delta(t) => text.push_str(&t),
                StreamEvent::Done { .. } => done = true,
                _ => {}
            }
        }
        assert_eq!(text, "hi");
        assert!(done);
    }

    #[tokio::test]
    async fn test_chat_stream_maps_http_errors() {
        use axum::http::StatusCode;

        async fn handler() -> (StatusCode, &'static str) {
            (
                StatusCode::UNAUTHORIZED,
                r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
            )
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/v1/messages", post(handler));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let provider = ClaudeProvider::new("bad").with_api_base(&format!("http://{}", addr));
        let err = provider
            .chat_stream(vec![Message::user("hi")], vec![], None, ChatOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentLineError::ProviderTyped(crate::error::ProviderError::Auth(_))
        ));
        assert!(err.to_string().contains("authentication_error"));
    }
}
