use axum::{
    Json,
    extract::{Path, State},
};
use bson::oid::ObjectId;
use serde::Serialize;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct BoothResponse {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub serving_number: i64,
    pub waiting_count: u64,
    pub logo_url: Option<String>,
}

pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(booth_id): Path<String>,
) -> Result<Json<BoothResponse>, ApiError> {
    let bid = ObjectId::parse_str(&booth_id)
        .map_err(|_| ApiError::BadRequest("Invalid booth_id".to_string()))?;

    let booth = state.booths.find(bid).await?;
    let waiting_count = state.queue.dao().waiting_count(bid).await?;

    Ok(Json(BoothResponse {
        id: bid.to_hex(),
        event_id: booth.event_id.to_hex(),
        name: booth.name,
        serving_number: booth.serving_number,
        waiting_count,
        logo_url: booth.logo_url,
    }))
}
