//! Redelivery filter for webhook events.
//!
//! LINE retries deliveries it considers failed and marks them with the same
//! `webhookEventId`. The store remembers ids for a TTL so a retried event is
//! handled at most once.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Upper bound on remembered ids; the oldest is evicted past it.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// In-memory store of recently seen webhook event ids.
pub struct IdempotencyStore {
    seen: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
    max_entries: usize,
}

impl IdempotencyStore {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `event_id` and report whether this is its first delivery
    /// within the TTL.
    pub fn first_delivery(&self, event_id: &str) -> bool {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut seen = self.lock();

        seen.retain(|_, recorded| now.duration_since(*recorded) < ttl);
        if seen.contains_key(event_id) {
            return false;
        }

        if seen.len() >= self.max_entries {
            let oldest = seen
                .iter()
                .min_by_key(|(_, recorded)| **recorded)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                seen.remove(&id);
            }
        }

        seen.insert(event_id.to_string(), now);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
