use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use serde::Deserialize;
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// Presence webhook payload from the SFU room provider.
#[derive(Debug, Deserialize)]
pub struct MediaEvent {
    pub event: String,
    pub room_name: String,
    pub identity: String,
}

/// Provider webhooks authenticate with the shared API key, not a user JWT.
pub async fn events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<MediaEvent>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|key| key == state.settings.media.api_key);
    if !authorized {
        return Err(ApiError::Unauthorized("Invalid provider key".to_string()));
    }

    match body.event.as_str() {
        "participant_joined" => {
            state
                .orchestrator
                .handle_presence(&body.room_name, &body.identity, true)
                .await?;
        }
        "participant_left" => {
            state
                .orchestrator
                .handle_presence(&body.room_name, &body.identity, false)
                .await?;
        }
        other => {
            debug!(event = other, "Ignoring media provider event");
        }
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}
