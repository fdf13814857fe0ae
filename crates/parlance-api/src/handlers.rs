//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use parlance_dialog::{WebhookRequest, WebhookResponse};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub intents: u64,
    pub entities: u64,
}

/// POST /webhook - run the matched intent and answer in api.ai v1 format.
pub async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "webhook",
        %request_id,
        session_id = %request.session_id
    );

    let outcome = state.assistant.handle(&request).instrument(span).await?;
    tracing::debug!(
        %request_id,
        intent = %outcome.intent,
        state = %outcome.state,
        "Webhook answered"
    );
    Ok(Json(outcome.to_webhook_response()))
}

/// GET /health - liveness plus the size of the declared catalog.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let catalog = state.assistant.catalog();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        intents: catalog.intents.len() as u64,
        entities: catalog.entities.len() as u64,
    })
}
