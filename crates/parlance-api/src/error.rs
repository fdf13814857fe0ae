//! API error types and JSON error response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parlance_dialog::DialogError;
use serde::Serialize;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request").
    pub error: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 - the body is not a webhook request.
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// 401 - missing or wrong bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// 500 - the invocation lifecycle broke down.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DialogError> for ApiError {
    fn from(err: DialogError) -> Self {
        match err {
            DialogError::MalformedRequest(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_dialog::InvocationState;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_dialog_error_mapping() {
        let err: ApiError =
            DialogError::InvalidTransition(InvocationState::Finalized, InvocationState::Start)
                .into();
        assert!(matches!(err, ApiError::Internal(_)));
        let err: ApiError = DialogError::MalformedRequest("no result".into()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
