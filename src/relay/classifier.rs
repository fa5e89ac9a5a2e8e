//! SSE line classification.
//!
//! The agent runtime interleaves two shapes of `data:` lines: Converse-style
//! JSON objects (`{"event": {...}}`) that carry the actual content, and a
//! JSON-string rendering of the same events that is redundant. Only the
//! object shape is interpreted; everything else classifies as [`StreamEvent::Ignore`].

use serde_json::{Map, Value};
use tracing::warn;

use crate::utils::string::preview;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// One classified line of the runtime's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A chunk of assistant text.
    TextDelta { text: String },
    /// The agent started a tool call.
    ToolStart { tool_name: String },
    /// A content block finished; buffered text should be flushed.
    BlockEnd,
    /// End-of-stream marker (`data: [DONE]`).
    Done,
    /// Noise: non-data lines, malformed JSON, lifecycle events, string payloads.
    Ignore,
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are unpopulated.
fn is_populated(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Classify a single SSE line.
///
/// Pure apart from a warning log on malformed JSON; the same input always
/// yields the same event.
pub fn classify_line(line: &str) -> StreamEvent {
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return StreamEvent::Ignore;
    };
    let payload = rest.trim();

    if payload == DONE_MARKER {
        return StreamEvent::Done;
    }

    let parsed: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, data = %preview(payload, 200), "Failed to parse SSE data");
            return StreamEvent::Ignore;
        }
    };

    // String payloads repeat what the object events already carry.
    let Some(envelope) = parsed.as_object() else {
        return StreamEvent::Ignore;
    };
    let Some(inner) = envelope.get("event").and_then(Value::as_object) else {
        return StreamEvent::Ignore;
    };

    classify_inner(inner)
}

fn classify_inner(inner: &Map<String, Value>) -> StreamEvent {
    let delta_block = inner.get("contentBlockDelta");
    if is_populated(delta_block) {
        let text = delta_block
            .and_then(|b| b.get("delta"))
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("");
        if text.is_empty() {
            return StreamEvent::Ignore;
        }
        return StreamEvent::TextDelta {
            text: text.to_string(),
        };
    }

    let start_block = inner.get("contentBlockStart");
    if is_populated(start_block) {
        let tool_use = start_block
            .and_then(|b| b.get("start"))
            .and_then(|s| s.get("toolUse"));
        if !is_populated(tool_use) {
            return StreamEvent::Ignore;
        }
        let tool_name = tool_use
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return StreamEvent::ToolStart {
            tool_name: tool_name.to_string(),
        };
    }

    if inner.contains_key("contentBlockStop") {
        return StreamEvent::BlockEnd;
    }

    StreamEvent::Ignore
}
