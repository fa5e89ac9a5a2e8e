//! Stream relay - agent event stream to chat push messages
//!
//! The relay reads the agent runtime's SSE lines one at a time and turns them
//! into discrete, ordered push messages:
//!
//! ```text
//!  SSE line ──► classify_line ──► StreamEvent
//!                                   │
//!        TextDelta ─────────────────┼──► TextBuffer.append
//!        ToolStart ──► flush, then ─┼──► ToolStatusMap.describe ──► push
//!        BlockEnd  ──► flush ───────┼──► push
//!        Done      ──► stop         │
//!        Ignore    ──► (nothing)    ▼
//!                              end of stream ──► final flush
//! ```
//!
//! Any error while reading or pushing ends the run with a single failure
//! notice to the destination.

mod buffer;
mod classifier;
mod status;
mod stream;

pub use buffer::TextBuffer;
pub use classifier::{classify_line, StreamEvent};
pub use status::ToolStatusMap;
pub use stream::{RelayOutcome, StreamRelay};
