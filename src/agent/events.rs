//! Converse-style stream events emitted by an agent turn.
//!
//! Each event serializes to the JSON object the runtime server writes after
//! `data: `, wrapped as `{"event": {...}}`.

use serde_json::{json, Value};

/// One event of an agent turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ConverseEvent {
    MessageStart,
    /// The model opened a tool-use block.
    ToolUseStart {
        index: usize,
        tool_use_id: String,
        name: String,
    },
    /// A chunk of assistant text.
    TextDelta { index: usize, text: String },
    ContentBlockStop { index: usize },
    /// End of one model response; `stop_reason` is `end_turn` or `tool_use`.
    MessageStop { stop_reason: String },
}

impl ConverseEvent {
    /// Render as the `{"event": {...}}` envelope.
    pub fn to_json(&self) -> Value {
        let inner = match self {
            ConverseEvent::MessageStart => json!({
                "messageStart": { "role": "assistant" }
            }),
            ConverseEvent::ToolUseStart {
                index,
                tool_use_id,
                name,
            } => json!({
                "contentBlockStart": {
                    "contentBlockIndex": index,
                    "start": { "toolUse": { "toolUseId": tool_use_id, "name": name } }
                }
            }),
            ConverseEvent::TextDelta { index, text } => json!({
                "contentBlockDelta": {
                    "contentBlockIndex": index,
                    "delta": { "text": text }
                }
            }),
            ConverseEvent::ContentBlockStop { index } => json!({
                "contentBlockStop": { "contentBlockIndex": index }
            }),
            ConverseEvent::MessageStop { stop_reason } => json!({
                "messageStop": { "stopReason": stop_reason }
            }),
        };
        json!({ "event": inner })
    }

    /// The SSE `data:` payload for this event.
    pub fn to_sse_data(&self) -> String {
        self.to_json().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{classify_line, StreamEvent};

    fn classify(event: &ConverseEvent) -> StreamEvent {
        classify_line(&format!("data: {}", event.to_sse_data()))
    }

    #[test]
    fn test_text_delta_shape() {
        let event = ConverseEvent::TextDelta {
            index: 0,
            text: "こんにちは".to_string(),
        };
        let json = event.to_json();
        assert_eq!(json["event"]["contentBlockDelta"]["delta"]["text"], "こんにちは");
    }

    #[test]
    fn test_events_classify_as_relay_expects() {
        assert_eq!(
            classify(&ConverseEvent::TextDelta {
                index: 0,
                text: "Hi".to_string()
            }),
            StreamEvent::TextDelta {
                text: "Hi".to_string()
            }
        );
        assert_eq!(
            classify(&ConverseEvent::ToolUseStart {
                index: 1,
                tool_use_id: "toolu_1".to_string(),
                name: "web_search".to_string(),
            }),
            StreamEvent::ToolStart {
                tool_name: "web_search".to_string()
            }
        );
        assert_eq!(
            classify(&ConverseEvent::ContentBlockStop { index: 0 }),
            StreamEvent::BlockEnd
        );
        assert_eq!(classify(&ConverseEvent::MessageStart), StreamEvent::Ignore);
        assert_eq!(
            classify(&ConverseEvent::MessageStop {
                stop_reason: "end_turn".to_string()
            }),
            StreamEvent::Ignore
        );
    }
}
