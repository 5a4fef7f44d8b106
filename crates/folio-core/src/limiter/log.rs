//! The persisted record of accepted submissions.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::error::{CoreError, CoreResult};

/// Ordered millisecond timestamps of accepted submissions.
///
/// Serialises as a bare JSON array, e.g. `[1718000000000,1718000050000]`.
/// Insertion order is chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionLog {
    timestamps: Vec<Timestamp>,
}

impl SubmissionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_timestamps(timestamps: Vec<Timestamp>) -> Self {
        Self { timestamps }
    }

    /// Parses a stored value, falling back to an empty log.
    ///
    /// Anything that is not a JSON array of non-negative integers reads as
    /// empty. Corrupt state must never block the limiter from deciding.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Self>(raw) {
            Ok(log) => log,
            Err(e) => {
                tracing::debug!("Discarding unparseable submission log: {e}");
                Self::new()
            }
        }
    }

    /// Serialises the log to its stored JSON form.
    pub fn encode(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Storage(e.to_string()))
    }

    /// Returns the entries still inside the window ending at `now`.
    ///
    /// An entry survives while `now - t < window_ms`, so the live interval is
    /// `(now - window_ms, now]`. Entries stamped after `now` are kept.
    pub fn pruned(&self, now: Timestamp, window_ms: u64) -> Self {
        let timestamps = self
            .timestamps
            .iter()
            .copied()
            .filter(|&t| now.saturating_sub(t) < window_ms)
            .collect();
        Self { timestamps }
    }

    pub fn push(&mut self, timestamp: Timestamp) {
        self.timestamps.push(timestamp);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// The `n`-th oldest entry (0-based), regardless of storage order.
    pub fn nth_oldest(&self, n: usize) -> Option<Timestamp> {
        let mut sorted = self.timestamps.clone();
        sorted.sort_unstable();
        sorted.get(n).copied()
    }
}
