//! Agent turn loop: stream a model response, run requested tools, repeat.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::{AgentLineError, Result};
use crate::providers::{ChatOptions, LLMProvider, LLMToolCall, StreamEvent};
use crate::session::{Conversation, Message, ToolCall};
use crate::tools::{ToolContext, ToolRegistry};

use super::ConverseEvent;

/// A stateful agent bound to one conversation.
///
/// The agent keeps the message history across turns. A failed turn leaves the
/// history exactly as it was before the turn started.
pub struct Agent {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    conversation: Conversation,
    system_prompt: String,
    model: Option<String>,
    options: ChatOptions,
    max_tool_iterations: usize,
    session_id: String,
}

/// Text and tool calls of one model response.
struct ModelResponse {
    content: String,
    tool_calls: Vec<LLMToolCall>,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Self {
        let mut options = ChatOptions::new().with_max_tokens(config.max_tokens);
        if let Some(temperature) = config.temperature {
            options = options.with_temperature(temperature);
        }
        let model = if config.model.trim().is_empty() {
            None
        } else {
            Some(config.model.clone())
        };

        Self {
            provider,
            tools,
            conversation: Conversation::new(),
            system_prompt: config.system_prompt.clone(),
            model,
            options,
            max_tool_iterations: config.max_tool_iterations,
            session_id: String::new(),
        }
    }

    /// Tag tool invocations with the owning session id.
    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = session_id.to_string();
        self
    }

    pub fn history(&self) -> &Conversation {
        &self.conversation
    }

    /// Run one conversation turn for `prompt`, streaming events into `sink`.
    ///
    /// Returns the final assistant text. Sink send failures are ignored so a
    /// disconnected client does not leave the history half-written.
    ///
    /// # Errors
    ///
    /// Returns the provider error when a model call fails; the history is
    /// rolled back to its state before the turn.
    pub async fn run_turn(
        &mut self,
        prompt: &str,
        sink: &mpsc::Sender<ConverseEvent>,
    ) -> Result<String> {
        let checkpoint = self.conversation.len();
        match self.run_turn_inner(prompt, sink).await {
            Ok(content) => Ok(content),
            Err(e) => {
                self.conversation.truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_turn_inner(
        &mut self,
        prompt: &str,
        sink: &mpsc::Sender<ConverseEvent>,
    ) -> Result<String> {
        self.conversation.push(Message::user(prompt));
        let tool_ctx = ToolContext::new().with_session(&self.session_id);

        let mut iteration = 0;
        loop {
            let response = self.stream_response(sink).await?;

            if response.tool_calls.is_empty() {
                self.conversation.push(Message::assistant(&response.content));
                return Ok(response.content);
            }

            if iteration >= self.max_tool_iterations {
                warn!(
                    iterations = iteration,
                    session = %self.session_id,
                    "Tool loop reached maximum iterations"
                );
                return Err(AgentLineError::Session(format!(
                    "tool iteration limit ({}) reached",
                    self.max_tool_iterations
                )));
            }
            iteration += 1;
            debug!("Tool iteration {} of {}", iteration, self.max_tool_iterations);

            let calls: Vec<ToolCall> = response
                .tool_calls
                .iter()
                .map(|tc| ToolCall::new(&tc.id, &tc.name, &tc.arguments))
                .collect();
            self.conversation
                .push(Message::assistant_with_tools(&response.content, calls));

            for tool_call in &response.tool_calls {
                info!(tool = %tool_call.name, id = %tool_call.id, "Executing tool");
                let args = match serde_json::from_str(&tool_call.arguments) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(tool = %tool_call.name, error = %e, "Invalid JSON in tool arguments");
                        serde_json::json!({})
                    }
                };
                let result = match self
                    .tools
                    .execute_with_context(&tool_call.name, args, &tool_ctx)
                    .await
                {
                    Ok(output) => output,
                    Err(e) => format!("Error: {}", e),
                };
                self.conversation
                    .push(Message::tool_result(&tool_call.id, &result));
            }
        }
    }

    /// Stream one model response, forwarding events to `sink`.
    async fn stream_response(&self, sink: &mpsc::Sender<ConverseEvent>) -> Result<ModelResponse> {
        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(Message::system(&self.system_prompt));
        }
        messages.extend(self.conversation.messages().iter().cloned());

        let mut rx = self
            .provider
            .chat_stream(
                messages,
                self.tools.definitions(),
                self.model.as_deref(),
                self.options.clone(),
            )
            .await?;

        let _ = sink.send(ConverseEvent::MessageStart).await;

        let mut index = 0;
        let mut tool_calls = Vec::new();
        let mut content = None;

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Delta(text) => {
                    let _ = sink.send(ConverseEvent::TextDelta { index, text }).await;
                }
                StreamEvent::ToolUseStart { id, name } => {
                    let _ = sink
                        .send(ConverseEvent::ToolUseStart {
                            index,
                            tool_use_id: id,
                            name,
                        })
                        .await;
                }
                StreamEvent::BlockStop => {
                    let _ = sink.send(ConverseEvent::ContentBlockStop { index }).await;
                    index += 1;
                }
                StreamEvent::ToolCalls(calls) => tool_calls = calls,
                StreamEvent::Done { content: text, usage } => {
                    if let Some(usage) = usage {
                        debug!(
                            prompt_tokens = usage.prompt_tokens,
                            completion_tokens = usage.completion_tokens,
                            "Model response complete"
                        );
                    }
                    content = Some(text);
                    break;
                }
                StreamEvent::Error(e) => return Err(e),
            }
        }

        let content = content.ok_or_else(|| {
            AgentLineError::Provider("model stream ended before completion".to_string())
        })?;

        let stop_reason = if tool_calls.is_empty() {
            "end_turn"
        } else {
            "tool_use"
        };
        let _ = sink
            .send(ConverseEvent::MessageStop {
                stop_reason: stop_reason.to_string(),
            })
            .await;

        Ok(ModelResponse {
            content,
            tool_calls,
        })
    }
}
