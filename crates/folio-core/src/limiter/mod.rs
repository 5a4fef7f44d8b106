//! Rolling-window submission limiter.
//!
//! [`RateLimiter::check_and_consume`] reads the persisted
//! [`SubmissionLog`], prunes it, decides, and records the new submission in
//! one call. An allowed submission is recorded before the caller sends
//! anything, so there is no check-only operation.
//!
//! Persistence is best-effort: a failed write is logged and the decision
//! stands.

pub mod log;

use std::time::Duration;

use crate::clock::Timestamp;
use crate::store::KvStore;

pub use log::SubmissionLog;

/// Maximum accepted submissions per window.
pub const MAX_PER_WINDOW: usize = 5;

/// Rolling window length in milliseconds (one hour).
pub const WINDOW_MS: u64 = 60 * 60 * 1000;

/// Key under which the submission log is stored.
pub const STORAGE_KEY: &str = "email_sent_timestamps";

/// Quota parameters for a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_per_window: usize,
    pub window_ms: u64,
    pub storage_key: &'static str,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_per_window: MAX_PER_WINDOW,
            window_ms: WINDOW_MS,
            storage_key: STORAGE_KEY,
        }
    }
}

impl RateLimitPolicy {
    /// Expiry given to the stored record on every write.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Outcome of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The submission was recorded. `remaining` slots are left in the window.
    Allowed { remaining: usize },
    /// The window is full. Nothing was recorded.
    Denied { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Gates submissions to at most `max_per_window` per rolling window.
#[derive(Debug)]
pub struct RateLimiter<S> {
    store: S,
    policy: RateLimitPolicy,
}

impl<S: KvStore> RateLimiter<S> {
    /// Creates a limiter with the default five-per-hour policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RateLimitPolicy::default())
    }

    pub fn with_policy(store: S, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gives the store back, e.g. to flush pending writes to a response.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Decides whether a submission at `now` is permitted and records it if so.
    pub fn check_and_consume(&mut self, now: Timestamp) -> Decision {
        let stored = self.load();
        let mut live = stored.pruned(now, self.policy.window_ms);

        if !live.is_empty() && live.len() < stored.len() {
            self.persist(&live);
        }

        if live.len() >= self.policy.max_per_window {
            let retry_after = self.retry_after(&live, now);
            tracing::info!(
                "Submission denied: {} in window, retry in {}s",
                live.len(),
                retry_after.as_secs()
            );
            return Decision::Denied { retry_after };
        }

        live.push(now);
        self.persist(&live);
        let remaining = self.policy.max_per_window - live.len();
        tracing::debug!("Submission allowed, {remaining} remaining in window");
        Decision::Allowed { remaining }
    }

    fn load(&self) -> SubmissionLog {
        self.store
            .get(self.policy.storage_key)
            .map(|raw| SubmissionLog::parse(&raw))
            .unwrap_or_default()
    }

    fn persist(&mut self, log: &SubmissionLog) {
        let result = log.encode().and_then(|value| {
            self.store
                .set(self.policy.storage_key, &value, self.policy.ttl())
        });
        if let Err(e) = result {
            tracing::warn!("Failed to persist submission log: {e}");
        }
    }

    /// Time until enough entries leave the window for one more submission.
    fn retry_after(&self, live: &SubmissionLog, now: Timestamp) -> Duration {
        let blocking = live.len() + 1 - self.policy.max_per_window.max(1);
        match live.nth_oldest(blocking.saturating_sub(1)) {
            Some(t) if self.policy.max_per_window > 0 => Duration::from_millis(
                t.saturating_add(self.policy.window_ms).saturating_sub(now),
            ),
            _ => self.policy.ttl(),
        }
    }
}
