//! Error types for `folio-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.

/// Unified error type for all core operations.
///
/// Rate-limit denials are not errors: they are reported through
/// [`Decision`](crate::Decision).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A contact form field failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    /// The key/value store refused a write.
    #[error("storage error: {0}")]
    Storage(String),

    /// The mail provider rejected or never received the message.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Convenience alias used throughout `folio-core`.
pub type CoreResult<T> = Result<T, CoreError>;
