//! Scripted provider for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ChatOptions, LLMProvider, LLMToolCall, StreamEvent, ToolDefinition};
use crate::error::{AgentLineError, Result};
use crate::session::Message;

/// One scripted model response.
pub(crate) enum Script {
    /// Stream these text chunks, then finish.
    Text(Vec<&'static str>),
    /// Request the given `(id, name, arguments)` tool calls.
    Tools(Vec<(&'static str, &'static str, &'static str)>),
    /// Stream some text, then fail mid-stream.
    FailAfter(Vec<&'static str>),
    /// Reject the request before streaming.
    Reject,
}

/// Replays one [`Script`] per `chat_stream` call and records the requests.
pub(crate) struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Messages sent with each request so far.
    pub(crate) fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

fn events_for(script: Script) -> Vec<StreamEvent> {
    match script {
        Script::Text(chunks) => {
            let mut events: Vec<StreamEvent> = chunks
                .iter()
                .map(|c| StreamEvent::Delta(c.to_string()))
                .collect();
            events.push(StreamEvent::BlockStop);
            events.push(StreamEvent::Done {
                content: chunks.concat(),
                usage: None,
            });
            events
        }
        Script::Tools(calls) => {
            let mut events = Vec::new();
            let mut tool_calls = Vec::new();
            for (id, name, args) in calls {
                events.push(StreamEvent::ToolUseStart {
                    id: id.to_string(),
                    name: name.to_string(),
                });
                events.push(StreamEvent::BlockStop);
                tool_calls.push(LLMToolCall::new(id, name, args));
            }
            events.push(StreamEvent::ToolCalls(tool_calls));
            events.push(StreamEvent::Done {
                content: String::new(),
                usage: None,
            });
            events
        }
        Script::FailAfter(chunks) => {
            let mut events: Vec<StreamEvent> = chunks
                .iter()
                .map(|c| StreamEvent::Delta(c.to_string()))
                .collect();
            events.push(StreamEvent::Error(AgentLineError::Provider(
                "scripted failure".to_string(),
            )));
            events
        }
        Script::Reject => Vec::new(),
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat_stream(
        &self,
        messages: Vec<Message>,
        _tools: Vec<ToolDefinition>,
        _model: Option<&str>,
        _options: ChatOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        self.requests.lock().unwrap().push(messages);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Reject);
        if matches!(script, Script::Reject) {
            return Err(AgentLineError::Provider("scripted rejection".to_string()));
        }

        let events = events_for(script);
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            let _ = tx.send(event).await;
        }
        Ok(rx)
    }

    fn default_model(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
