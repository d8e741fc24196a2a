use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::quota::{QuotaError, QuotaExceeded};
use crate::validation::ContentError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Caller-facing vs internal
///
/// Validation, quota and authorization failures are shown to the caller
/// verbatim. Everything else is logged server-side and replaced with a
/// generic message so internal details never leak into responses.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ContentError),

    #[error(transparent)]
    RateLimited(#[from] QuotaExceeded),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Storage full: {0}")]
    StorageFull(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<QuotaError> for AppError {
    fn from(err: QuotaError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl AppError {
    /// Stable machine-readable label, used as the `error` field of responses
    /// and as the `outcome` label of mutation metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::RateLimited(_) => "rate_limited",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::StorageFull(_) => "storage_full",
            AppError::SerializationError(_) => "serialization_error",
            AppError::Internal(_) => "internal_error",
            AppError::ConfigError(_) => "config_error",
        }
    }
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::Validation(e) => {
                tracing::debug!(error = %e, "Content rejected");
                (StatusCode::BAD_REQUEST, "validation_error", e.to_string())
            }
            AppError::RateLimited(exceeded) => {
                tracing::warn!(
                    operation = %exceeded.operation,
                    retry_after_secs = exceeded.retry_after_secs(),
                    "Quota exceeded"
                );
                return rate_limited_response(exceeded);
            }
            AppError::Unauthorized(msg) => {
                tracing::debug!(reason = %msg, "Unauthorized request");
                let mut response = json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg, None);
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer"),
                );
                return response;
            }
            AppError::Forbidden(msg) => {
                tracing::warn!(reason = %msg, "Forbidden request");
                (StatusCode::FORBIDDEN, "forbidden", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                msg.clone(),
            ),
            AppError::StorageFull(msg) => {
                tracing::warn!(reason = %msg, "Upload refused, storage full");
                (StatusCode::INSUFFICIENT_STORAGE, "storage_full", msg.clone())
            }
            AppError::SerializationError(e) => (
                StatusCode::BAD_REQUEST,
                "serialization_error",
                sanitize_serde_error(e),
            ),

            // Internal errors - never expose internal details to clients
            AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred. Please contact support if the issue persists."
                        .to_string(),
                )
            }
            AppError::ConfigError(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_error",
                    "Service configuration error. Please contact support.".to_string(),
                )
            }
        };

        json_error(status, error_type, &message, None)
    }
}

fn json_error(
    status: StatusCode,
    error_type: &str,
    message: &str,
    retry_after_secs: Option<u64>,
) -> Response {
    let body = ErrorResponse {
        error: error_type.to_string(),
        message: message.to_string(),
        retry_after_secs,
    };
    (status, axum::Json(body)).into_response()
}

/// Build the 429 response, carrying retry guidance in both headers and body.
fn rate_limited_response(exceeded: &QuotaExceeded) -> Response {
    let retry_after = exceeded.retry_after_secs();
    let mut response = json_error(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        &exceeded.to_string(),
        Some(retry_after),
    );

    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    headers.insert("x-ratelimit-limit", HeaderValue::from(exceeded.capacity));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
    response
}

/// Sanitize serde error messages to avoid leaking internal type information.
fn sanitize_serde_error(e: &serde_json::Error) -> String {
    let msg = e.to_string();

    if msg.contains("missing field")
        && let Some(start) = msg.find('`')
        && let Some(end) = msg[start + 1..].find('`')
    {
        let field = &msg[start + 1..start + 1 + end];
        return format!("Missing required field: {field}");
    }

    if msg.contains("invalid type") {
        return "Invalid data type in request body".to_string();
    }

    "Malformed JSON in request body".to_string()
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::quota::Operation;

    #[test]
    fn test_validation_error_keeps_message() {
        let err = AppError::from(ContentError::Empty);
        assert_eq!(err.to_string(), "Message cannot be empty");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rate_limited_sets_retry_headers() {
        let err = AppError::from(QuotaExceeded {
            operation: Operation::SendMessage,
            capacity: 15,
            retry_after: Duration::from_millis(5_200),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "6");
        assert_eq!(response.headers()["x-ratelimit-limit"], "15");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    }

    #[test]
    fn test_unauthorized_sets_challenge() {
        let response = AppError::Unauthorized("sign in".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn test_internal_error_is_sanitized() {
        let response = AppError::Internal("lock poisoned at store.rs:42".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(AppError::from(ContentError::Empty).kind(), "validation_error");
        assert_eq!(AppError::Forbidden(String::new()).kind(), "forbidden");
        assert_eq!(AppError::NotFound(String::new()).kind(), "not_found");
        assert_eq!(AppError::StorageFull(String::new()).kind(), "storage_full");
    }

    #[test]
    fn test_storage_full_status() {
        let response = AppError::StorageFull("no room".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
    }

    #[test]
    fn test_sanitize_truncated_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(sanitize_serde_error(&err), "Malformed JSON in request body");
    }
}
