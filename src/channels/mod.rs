//! Channels module - the LINE side of the bridge
//!
//! Everything that talks to the chat platform lives here: signature checks
//! on inbound deliveries, webhook payload parsing, conversation routing and
//! the outbound push client.
//!
//! # Architecture
//!
//! ```text
//!   POST /webhook ──► SignatureVerifier ──► parse_webhook ──► Vec<ChatEvent>
//!                                                                  │
//!                                                                  ▼
//!                                                        ConversationRouter
//!                                                          │            │
//!                                          AgentRuntime::invoke    PushSender
//!                                                          │        (LineClient)
//!                                                          ▼            ▲
//!                                                     StreamRelay ──────┘
//! ```
//!
//! The router and relay only see the `PushSender` and `AgentRuntime` traits,
//! so both can be driven by in-memory fakes.

pub mod events;
pub mod line;
pub mod router;
pub mod signature;
mod types;

pub use events::{parse_webhook, ChatEvent, ConversationContext, EventKind, Mention};
pub use line::LineClient;
pub use router::{route_event, strip_self_mentions, ConversationRouter, RoutedTurn, SkipReason, TurnOutcome};
pub use signature::{LineSignatureVerifier, SignatureVerifier, SIGNATURE_HEADER};
pub use types::{OutboundMessage, PushSender};
