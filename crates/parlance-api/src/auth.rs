//! Optional bearer-token protection for the webhook.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

/// Validates `Authorization: Bearer <token>` against the configured webhook
/// token. Passes everything through when no token is configured.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.webhook_token.as_deref() else {
        return next.run(req).await;
    };

    let value = match req.headers().get("authorization") {
        Some(value) => value,
        None => {
            return ApiError::Unauthorized("Missing Authorization header".into()).into_response()
        }
    };
    let Ok(value) = value.to_str() else {
        return ApiError::Unauthorized("Invalid Authorization header encoding".into())
            .into_response();
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if token == expected => next.run(req).await,
        _ => {
            tracing::warn!("Rejected webhook call with invalid bearer token");
            ApiError::Unauthorized("Invalid bearer token".into()).into_response()
        }
    }
}
