//! Agent module - session-scoped conversation turns
//!
//! An [`Agent`] holds one conversation's history and runs turns against an
//! LLM provider, executing tool calls between model responses. Progress is
//! reported as [`ConverseEvent`]s, which the runtime server writes out as SSE.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   prompt   ┌─────────────┐  chat_stream  ┌─────────────┐
//! │ runtime      │──────────>│    Agent    │─────────────>│ LLMProvider │
//! │ server       │<──────────│  (history)  │<─────────────│  (Claude)   │
//! └──────────────┘  Converse  └─────────────┘  StreamEvent  └─────────────┘
//!                   events          │
//!                                   ▼
//!                            ┌─────────────┐
//!                            │    Tools    │
//!                            │  Registry   │
//!                            └─────────────┘
//! ```

mod events;
mod r#loop;

pub use events::ConverseEvent;
pub use r#loop::Agent;
