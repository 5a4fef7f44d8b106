//! Contact form messages and their delivery seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_MESSAGE_LEN: usize = 5000;

/// A validated contact form submission.
///
/// Fields are trimmed on construction; every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    name: String,
    email: String,
    message: String,
}

impl ContactMessage {
    /// Trims and validates the three form fields.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidField`] naming the first field that is empty, too
    /// long, or (for `email`) not shaped like an address.
    pub fn new(name: &str, email: &str, message: &str) -> CoreResult<Self> {
        let name = required("name", name, MAX_NAME_LEN)?;
        let email = required("email", email, MAX_EMAIL_LEN)?;
        let message = required("message", message, MAX_MESSAGE_LEN)?;

        if !looks_like_email(&email) {
            return Err(CoreError::InvalidField {
                field: "email",
                reason: "is not a valid address",
            });
        }

        Ok(Self {
            name,
            email,
            message,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn required(field: &'static str, value: &str, max_chars: usize) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidField {
            field,
            reason: "must not be empty",
        });
    }
    if trimmed.chars().count() > max_chars {
        return Err(CoreError::InvalidField {
            field,
            reason: "is too long",
        });
    }
    Ok(trimmed.to_string())
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Where a submission attempt ended up, as shown on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    /// The form before any submit. Never returned by the API.
    Idle,
    Success,
    Error,
    #[serde(rename = "ratelimit")]
    RateLimited,
}

/// Delivers contact messages to the site owner.
///
/// Delivery failures are independent of rate-limit state: a slot consumed
/// for a message that then fails to send stays consumed.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> CoreResult<()>;
}
