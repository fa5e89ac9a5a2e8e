//! Session module - session-scoped agent handles with bounded lifetime
//!
//! The `SessionRegistry` maps a session id (the chat destination id) to a
//! shared agent handle. Entries idle longer than the TTL are dropped lazily,
//! at the start of every lookup; there is no background sweeper.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use agentline::session::SessionRegistry;
//!
//! let registry = SessionRegistry::new(Duration::from_secs(900), |_id: &str| Vec::<String>::new());
//!
//! let a = registry.get_or_create("C123");
//! let b = registry.get_or_create("C123");
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//!
//! // Empty ids are never cached
//! let c = registry.get_or_create("");
//! assert_eq!(registry.len(), 1);
//! # drop(c);
//! ```

pub mod types;

pub use types::{Conversation, Message, Role, ToolCall};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, info};

struct SessionEntry<H> {
    handle: Arc<H>,
    last_access: Instant,
}

/// Registry of session-scoped handles keyed by session id.
///
/// # Thread Safety
///
/// The map sits behind a `std::sync::Mutex` that is held only for the
/// lookup/insert itself, never across an await. The factory runs under the
/// lock, so it must be cheap and must not block; in exchange two concurrent
/// calls for one id never build two handles.
pub struct SessionRegistry<H> {
    entries: Mutex<HashMap<String, SessionEntry<H>>>,
    ttl: Duration,
    factory: Box<dyn Fn(&str) -> H + Send + Sync>,
}

impl<H> SessionRegistry<H> {
    /// Create a registry whose entries expire after `ttl` without access.
    ///
    /// `factory` receives the session id the handle is built for.
    pub fn new<F>(ttl: Duration, factory: F) -> Self
    where
        F: Fn(&str) -> H + Send + Sync + 'static,
    {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            factory: Box::new(factory),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry<H>>> {
        // A panic in another holder cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sweep(entries: &mut HashMap<String, SessionEntry<H>>, ttl: Duration, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_access) <= ttl);
        before - entries.len()
    }

    /// Remove every entry idle for longer than the TTL. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.lock();
        let removed = Self::sweep(&mut entries, self.ttl, Instant::now());
        if removed > 0 {
            info!(removed, remaining = entries.len(), "Expired agent sessions removed");
        }
        removed
    }

    /// Return the live handle for `session_id`, refreshing its last access,
    /// or build a new one.
    ///
    /// An empty id yields a fresh handle that is never stored.
    pub fn get_or_create(&self, session_id: &str) -> Arc<H> {
        let mut entries = self.lock();
        let now = Instant::now();
        let removed = Self::sweep(&mut entries, self.ttl, now);
        if removed > 0 {
            info!(removed, remaining = entries.len(), "Expired agent sessions removed");
        }

        if session_id.is_empty() {
            drop(entries);
            debug!("No session id, creating unregistered agent");
            return Arc::new((self.factory)(session_id));
        }

        if let Some(entry) = entries.get_mut(session_id) {
            entry.last_access = now;
            debug!(session_id = %session_id, "Reusing agent session");
            return Arc::clone(&entry.handle);
        }

        let handle = Arc::new((self.factory)(session_id));
        entries.insert(
            session_id.to_string(),
            SessionEntry {
                handle: Arc::clone(&handle),
                last_access: now,
            },
        );
        info!(session_id = %session_id, active = entries.len(), "Created agent session");
        handle
    }

    /// Number of stored sessions (expired ones included until the next sweep).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
