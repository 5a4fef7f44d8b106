use std::time::Duration;

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use folio_core::{CoreError, SubmitStatus};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    RateLimited { retry_after: Duration },
    Delivery(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    status: SubmitStatus,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, submit_status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, SubmitStatus::Error, msg.clone()),
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                SubmitStatus::RateLimited,
                "Too many messages. Please try again later.".to_string(),
            ),
            AppError::Delivery(msg) => {
                tracing::error!("Contact delivery failed: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    SubmitStatus::Error,
                    "Failed to send message".to_string(),
                )
            }
            AppError::Internal(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SubmitStatus::Error,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            status: submit_status,
            error: message,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let AppError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
        }
        response
    }
}

/// Whole seconds, rounded up so clients never retry early.
fn retry_after_secs(retry_after: Duration) -> u64 {
    retry_after.as_millis().div_ceil(1000) as u64
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidField { .. } => AppError::BadRequest(e.to_string()),
            CoreError::Delivery(msg) => AppError::Delivery(msg),
            CoreError::Storage(msg) => AppError::Internal(msg),
        }
    }
}
