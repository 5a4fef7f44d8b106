use folio_core::SubmitStatus;
use serde::{Deserialize, Serialize};

/// Contact form body. Field names match the form inputs; missing fields
/// deserialize as empty and are rejected by validation.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub status: SubmitStatus,
    /// Submissions left in the current window.
    pub remaining: usize,
}

impl ContactResponse {
    pub fn sent(remaining: usize) -> Self {
        Self {
            success: true,
            status: SubmitStatus::Success,
            remaining,
        }
    }
}
