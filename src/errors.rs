use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Terminal outcome of one fetch cycle against the Pollen API.
///
/// Every message carried here has already been credential-redacted at the
/// point of construction; nothing below this layer re-inspects raw errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// API key rejected (HTTP 401/403). The caller should invalidate the
    /// stored credential rather than retry.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limit still exceeded after the retry budget (HTTP 429).
    #[error("Quota exceeded")]
    Quota,

    /// Upstream 5xx after the retry budget.
    #[error("Pollen API HTTP {0}")]
    Server(u16),

    /// Non-retryable client-side status (4xx other than 401/403/429).
    #[error("Pollen API HTTP {0}")]
    ClientRequest(u16),

    /// Request timed out on every attempt.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Transport-level failure on every attempt.
    #[error("Network error: {0}")]
    Network(String),

    /// Anything unclassified. Not retried.
    #[error("Pollen API error: {0}")]
    Unexpected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream update failed: {0}")]
    UpdateFailed(#[from] FetchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::UpdateFailed(FetchError::Auth(_)) => (
                StatusCode::BAD_GATEWAY,
                "Pollen API rejected the credential; reauthentication required".to_string(),
            ),
            AppError::UpdateFailed(err) => {
                tracing::error!("Update failed: {}", err);
                (StatusCode::BAD_GATEWAY, "Pollen update failed".to_string())
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}
