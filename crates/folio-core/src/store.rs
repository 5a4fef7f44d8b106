//! Key/value storage seam for persisted limiter state.
//!
//! The limiter never talks to a concrete medium. Anything that can read a
//! string by key and write one back with a time-to-live can back it: a
//! browser cookie, an in-process map, or a remote cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::CoreResult;

/// Minimal key/value store with per-entry expiry.
pub trait KvStore {
    /// Returns the live value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value. The entry
    /// expires once `ttl` has elapsed without another write.
    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> CoreResult<()>;
}

impl<S: KvStore + ?Sized> KvStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> CoreResult<()> {
        (**self).set(key, value, ttl)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// `None` when `now + ttl` is past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process [`KvStore`] backed by a `HashMap`.
///
/// Expired entries read as absent. They stay in memory until the next
/// write to the same key or a call to [`MemoryStore::purge_expired`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Entry>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry whose expiry has passed.
    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        tracing::debug!(
            "Purged {} expired entries, {} remain",
            before - self.entries.len(),
            self.entries.len()
        );
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if !entry.is_live(Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> CoreResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }
}
