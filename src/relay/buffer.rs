//! Text accumulation between flush points.

use crate::utils::string::trim_to_chars;

/// Accumulates streamed text deltas until the relay decides to flush.
#[derive(Debug, Default)]
pub struct TextBuffer {
    text: String,
    max_chars: usize,
}

impl TextBuffer {
    /// Create an empty buffer whose flushed text is capped at `max_chars`.
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            max_chars,
        }
    }

    /// Append a delta. No limit is applied here.
    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Take the buffered text, trimmed and capped at `max_chars` characters.
    ///
    /// Always clears the buffer. Returns `None` when the buffer held only
    /// whitespace. Text beyond the cap is dropped, not split into a second message.
    pub fn flush(&mut self) -> Option<String> {
        let taken = std::mem::take(&mut self.text);
        trim_to_chars(&taken, self.max_chars)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
