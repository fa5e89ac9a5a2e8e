//! AgentLine - LINE webhook bridge with a streaming, session-scoped agent runtime

pub mod agent;
pub mod channels;
pub mod config;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod relay;
pub mod runtime;
pub mod session;
pub mod tools;
pub mod utils;

pub use config::Config;
pub use error::{AgentLineError, ProviderError, Result};
pub use relay::{RelayOutcome, StreamRelay};
pub use session::SessionRegistry;
