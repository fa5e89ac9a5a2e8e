//! Gateway module - the LINE webhook entry point
//!
//! ```text
//! LINE ──POST /webhook──> server::webhook ──verify──> parse_webhook
//!                              │                          │
//!                          200 {"status":"ok"}      IdempotencyStore
//!                                                         │
//!                                          tokio::spawn(process_batch)
//! ```

pub mod idempotency;
pub mod server;

pub use idempotency::IdempotencyStore;
pub use server::{router, serve, GatewayState};
