//! Stream relay: drives classifier, buffer and status map over a live stream.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, warn};

use super::buffer::TextBuffer;
use super::classifier::{classify_line, StreamEvent};
use super::status::ToolStatusMap;
use crate::channels::{OutboundMessage, PushSender};
use crate::config::RelayConfig;
use crate::error::Result;
use crate::runtime::LineStream;
use crate::utils::string::preview;

/// How a relay run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The stream was read to the end (or `[DONE]`) and every message delivered.
    Completed { messages_sent: usize },
    /// A read, decode or push error ended the run; the failure notice was attempted.
    Failed { messages_sent: usize },
}

/// Turns one streamed agent response into ordered push messages.
pub struct StreamRelay {
    sender: Arc<dyn PushSender>,
    status: ToolStatusMap,
    max_message_chars: usize,
    failure_notice: String,
}

impl StreamRelay {
    pub fn new(sender: Arc<dyn PushSender>, config: &RelayConfig) -> Self {
        Self {
            sender,
            status: ToolStatusMap::from_config(config),
            max_message_chars: config.max_message_chars,
            failure_notice: config.failure_notice.clone(),
        }
    }

    /// Relay `lines` to `to` until the stream ends or `[DONE]` arrives.
    ///
    /// Takes ownership of the stream; it is dropped exactly once before this
    /// returns, on every path. Errors never propagate: on failure a single
    /// failure notice is pushed and any buffered text is discarded.
    pub async fn run(&self, to: &str, mut lines: LineStream) -> RelayOutcome {
        let mut sent = 0usize;
        let result = self.drive(to, &mut lines, &mut sent).await;
        drop(lines);

        match result {
            Ok(()) => {
                debug!(to = %to, messages = sent, "Relay completed");
                RelayOutcome::Completed { messages_sent: sent }
            }
            Err(e) => {
                error!(to = %to, error = %e, "Error processing agent stream");
                self.notify_failure(to).await;
                RelayOutcome::Failed { messages_sent: sent }
            }
        }
    }

    async fn drive(&self, to: &str, lines: &mut LineStream, sent: &mut usize) -> Result<()> {
        let mut buffer = TextBuffer::new(self.max_message_chars);

        while let Some(line) = lines.next().await {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            debug!(line = %preview(&line, 200), "SSE line");

            match classify_line(&line) {
                StreamEvent::TextDelta { text } => buffer.append(&text),
                StreamEvent::ToolStart { tool_name } => {
                    self.flush(to, &mut buffer, sent).await?;
                    let status = self.status.describe(&tool_name);
                    self.send(to, &status, sent).await?;
                }
                StreamEvent::BlockEnd => self.flush(to, &mut buffer, sent).await?,
                StreamEvent::Done => break,
                StreamEvent::Ignore => {}
            }
        }

        self.flush(to, &mut buffer, sent).await
    }

    async fn flush(&self, to: &str, buffer: &mut TextBuffer, sent: &mut usize) -> Result<()> {
        match buffer.flush() {
            Some(text) => self.send(to, &text, sent).await,
            None => Ok(()),
        }
    }

    async fn send(&self, to: &str, text: &str, sent: &mut usize) -> Result<()> {
        self.sender.push(OutboundMessage::new(to, text)).await?;
        *sent += 1;
        Ok(())
    }

    async fn notify_failure(&self, to: &str) {
        if let Err(e) = self
            .sender
            .push(OutboundMessage::new(to, &self.failure_notice))
            .await
        {
            warn!(to = %to, error = %e, "Failed to deliver failure notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentLineError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<OutboundMessage>>,
        fail_on_call: Option<usize>,
        calls: Mutex<usize>,
    }

    impl RecordingSender {
        fn failing_at(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Default::default()
            }
        }

        fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PushSender for RecordingSender {
        async fn push(&self, msg: OutboundMessage) -> Result<()> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if self.fail_on_call == Some(call) {
                return Err(AgentLineError::Channel("push rejected".to_string()));
            }
            self.sent.lock().unwrap().push(msg);
            Ok(())
        }

        async fn show_loading(&self, _chat_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn stream_of(lines: &[&str]) -> LineStream {
        let owned: Vec<Result<String>> = lines.iter().map(|l| Ok(l.to_string())).collect();
        futures::stream::iter(owned).boxed()
    }

    fn delta(text: &str) -> String {
        format!(
            r#"data: {{"event": {{"contentBlockDelta": {{"delta": {{"text": "{}"}}}}}}}}"#,
            text
        )
    }

    fn tool_start(name: &str) -> String {
        format!(
            r#"data: {{"event": {{"contentBlockStart": {{"start": {{"toolUse": {{"name": "{}"}}}}}}}}}}"#,
            name
        )
    }

    const STOP: &str = r#"data: {"event": {"contentBlockStop": {}}}"#;

    fn relay(sender: Arc<RecordingSender>) -> StreamRelay {
        StreamRelay::new(sender, &RelayConfig::default())
    }

    #[tokio::test]
    async fn test_deltas_flushed_at_block_end() {
        let sender = Arc::new(RecordingSender::default());
        let lines = [delta("Hi"), delta(" there"), STOP.to_string(), "data: [DONE]".to_string()];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let outcome = relay(sender.clone()).run("U1", stream_of(&refs)).await;

        assert_eq!(outcome, RelayOutcome::Completed { messages_sent: 1 });
        assert_eq!(sender.texts(), vec!["Hi there"]);
        assert_eq!(sender.sent.lock().unwrap()[0].to, "U1");
    }

    #[tokio::test]
    async fn test_tool_start_flushes_before_status() {
        let sender = Arc::new(RecordingSender::default());
        let lines = [delta("Let me check"), tool_start("web_search")];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        relay(sender.clone()).run("U1", stream_of(&refs)).await;

        assert_eq!(sender.texts(), vec!["Let me check", "ウェブ検索しています..."]);
    }

    #[tokio::test]
    async fn test_unknown_tool_status() {
        let sender = Arc::new(RecordingSender::default());
        let lines = [tool_start("calculator")];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        relay(sender.clone()).run("U1", stream_of(&refs)).await;

        assert_eq!(sender.texts(), vec!["calculator を実行しています..."]);
    }

    #[tokio::test]
    async fn test_final_flush_without_done() {
        let sender = Arc::new(RecordingSender::default());
        let lines = [delta("tail"), String::new(), "garbage".to_string()];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let outcome = relay(sender.clone()).run("U1", stream_of(&refs)).await;

        assert_eq!(outcome, RelayOutcome::Completed { messages_sent: 1 });
        assert_eq!(sender.texts(), vec!["tail"]);
    }

    #[tokio::test]
    async fn test_done_stops_reading() {
        let sender = Arc::new(RecordingSender::default());
        let lines = [delta("before"), "data: [DONE]".to_string(), delta("after"), STOP.to_string()];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        relay(sender.clone()).run("U1", stream_of(&refs)).await;

        assert_eq!(sender.texts(), vec!["before"]);
    }

    #[tokio::test]
    async fn test_whitespace_only_block_sends_nothing() {
        let sender = Arc::new(RecordingSender::default());
        let lines = [delta("  "), STOP.to_string()];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let outcome = relay(sender.clone()).run("U1", stream_of(&refs)).await;

        assert_eq!(outcome, RelayOutcome::Completed { messages_sent: 0 });
        assert!(sender.texts().is_empty());
    }

    #[tokio::test]
    async fn test_read_error_sends_single_failure_notice() {
        let sender = Arc::new(RecordingSender::default());
        let items: Vec<Result<String>> = vec![
            Ok(delta("partial")),
            Err(AgentLineError::Runtime("connection reset".to_string())),
            Ok(delta("never")),
        ];

        let outcome = relay(sender.clone())
            .run("U1", futures::stream::iter(items).boxed())
            .await;

        assert_eq!(outcome, RelayOutcome::Failed { messages_sent: 0 });
        assert_eq!(
            sender.texts(),
            vec!["エラーが発生しました。もう一度お試しください。"]
        );
    }

    #[tokio::test]
    async fn test_push_error_sends_failure_notice() {
        // First push (the flushed text) fails, second push is the notice.
        let sender = Arc::new(RecordingSender::failing_at(1));
        let lines = [delta("hello"), STOP.to_string(), delta("more")];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        let outcome = relay(sender.clone()).run("U1", stream_of(&refs)).await;

        assert_eq!(outcome, RelayOutcome::Failed { messages_sent: 0 });
        assert_eq!(
            sender.texts(),
            vec!["エラーが発生しました。もう一度お試しください。"]
        );
    }

    #[tokio::test]
    async fn test_overlong_block_becomes_one_message() {
        let sender = Arc::new(RecordingSender::default());
        let long = "a".repeat(6000);
        let lines = [delta(&long), STOP.to_string()];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

        relay(sender.clone()).run("U1", stream_of(&refs)).await;

        let texts = sender.texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].chars().count(), 5000);
    }
}
