//! folio core library — contact submission logic without any HTTP.
//!
//! `folio-core` owns the rules for accepting a contact form submission: the
//! rolling-window limiter and the storage it persists into, message
//! validation, and the delivery seam. The web frontend (`folio-web`) wires
//! these to cookies and the mail provider.
//!
//! # Modules
//!
//! - [`limiter`] — [`RateLimiter`]: five submissions per rolling hour, one atomic `check_and_consume`.
//! - [`store`] — [`KvStore`] trait for the persisted log, plus [`MemoryStore`].
//! - [`contact`] — [`ContactMessage`] validation, [`Mailer`], [`SubmitStatus`].
//! - [`clock`] — millisecond [`Timestamp`]s.
//! - [`error`] — Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod clock;
pub mod contact;
pub mod error;
pub mod limiter;
pub mod store;

pub use clock::{now_millis, Timestamp};
pub use contact::{ContactMessage, Mailer, SubmitStatus};
pub use error::{CoreError, CoreResult};
pub use limiter::{Decision, RateLimitPolicy, RateLimiter, SubmissionLog};
pub use store::{KvStore, MemoryStore};
