//! Agent runtime client: invoke one turn and read the reply as SSE lines.

use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::Client;
use tracing::debug;

use super::InvocationRequest;
use crate::config::RuntimeConfig;
use crate::error::{AgentLineError, Result};
use crate::utils::string::preview;

/// Lines of a streamed agent response, in arrival order.
///
/// Each item is one line without its terminator. Dropping the stream releases
/// the underlying connection.
pub type LineStream = BoxStream<'static, Result<String>>;

/// Something that can run one agent turn and stream the reply.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Start a turn for `session_id` with `prompt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime could not be reached or refused the
    /// request. Failures after streaming started surface as `Err` items on
    /// the returned stream instead.
    async fn invoke(&self, prompt: &str, session_id: &str) -> Result<LineStream>;
}

/// HTTP client for an agent runtime exposing `POST /invocations`.
pub struct HttpAgentRuntime {
    client: Client,
    endpoint: String,
}

impl HttpAgentRuntime {
    /// Build a client for `config.url` with `config.timeout_secs` as the total
    /// request timeout (covering the whole streamed body).
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, &config.url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/invocations", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
    async fn invoke(&self, prompt: &str, session_id: &str) -> Result<LineStream> {
        let request = InvocationRequest {
            prompt: prompt.to_string(),
            session_id: Some(session_id.to_string()),
        };

        debug!(endpoint = %self.endpoint, session_id = %session_id, "Invoking agent runtime");

        let response = self
            .client
            .post(&self.endpoint)
            .header("accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentLineError::Runtime(format!("Agent runtime request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentLineError::Runtime(format!(
                "Agent runtime returned {}: {}",
                status,
                preview(&body, 200)
            )));
        }

        Ok(decode_lines(response.bytes_stream()))
    }
}

// ============================================================================
// Byte stream to line stream
// ============================================================================

struct LineDecoder<S> {
    inner: Pin<Box<S>>,
    pending: Vec<u8>,
    eof: bool,
    failed: bool,
}

impl<S, B, E> LineDecoder<S>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    fn take_line(&mut self) -> Option<Result<String>> {
        let newline = self.pending.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
        line.pop();
        Some(self.finish_line(line))
    }

    fn finish_line(&mut self, mut line: Vec<u8>) -> Result<String> {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line).map_err(|e| {
            self.failed = true;
            AgentLineError::Runtime(format!("Agent stream is not valid UTF-8: {}", e))
        })
    }

    async fn next_line(&mut self) -> Option<Result<String>> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(line) = self.take_line() {
                return Some(line);
            }
            if self.eof {
                if self.pending.is_empty() {
                    return None;
                }
                let rest = std::mem::take(&mut self.pending);
                return Some(self.finish_line(rest));
            }
            match self.inner.next().await {
                Some(Ok(chunk)) => self.pending.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(AgentLineError::Runtime(format!(
                        "Agent stream read error: {}",
                        e
                    ))));
                }
                None => self.eof = true,
            }
        }
    }
}

/// Split a chunked byte stream into lines.
///
/// Lines end at `\n`; a trailing `\r` is removed. Each complete line must be
/// valid UTF-8, so multi-byte characters split across chunks decode correctly.
/// The stream ends after the first error.
pub fn decode_lines<S, B, E>(bytes: S) -> LineStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let decoder = LineDecoder {
        inner: Box::pin(bytes),
        pending: Vec::new(),
        eof: false,
        failed: false,
    };
    stream::unfold(decoder, |mut decoder| async move {
        let line = decoder.next_line().await?;
        Some((line, decoder))
    })
    .boxed()
}
