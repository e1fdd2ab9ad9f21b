use axum::{
    Json,
    extract::{Path, State},
};
use bson::oid::ObjectId;
use fairline_db::models::Call;
use fairline_services::media::RoomCredential;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct InviteInterpreterRequest {
    pub interpreter_id: String,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub id: String,
    pub room_name: String,
    pub booth_id: String,
    pub recruiter_id: String,
    pub job_seeker_id: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub room_name: String,
    pub identity: String,
    pub token: String,
}

fn parse_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

fn call_response(call: Call) -> CallResponse {
    CallResponse {
        id: call.id.map(|id| id.to_hex()).unwrap_or_default(),
        room_name: call.room_name,
        booth_id: call.booth_id.to_hex(),
        recruiter_id: call.recruiter_id.to_hex(),
        job_seeker_id: call.job_seeker_id.to_hex(),
        state: call.state.as_str().to_string(),
    }
}

fn credential_response(cred: RoomCredential) -> CredentialResponse {
    CredentialResponse {
        room_name: cred.room_name,
        identity: cred.identity,
        token: cred.token,
    }
}

/// Recruiter calls the next attendee off the queue.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let eid = parse_id(&entry_id, "queue_entry_id")?;
    let (call, credential) = state.orchestrator.create_call(eid, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "call": call_response(call),
        "credential": credential_response(credential),
    })))
}

pub async fn respond(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<String>,
    Json(body): Json<RespondRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&call_id, "call_id")?;
    let credential = state
        .orchestrator
        .respond_to_invitation(cid, auth.user_id, body.accept)
        .await?;

    Ok(Json(serde_json::json!({
        "accepted": body.accept,
        "credential": credential.map(credential_response),
    })))
}

pub async fn invite_interpreter(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<String>,
    Json(body): Json<InviteInterpreterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&call_id, "call_id")?;
    let iid = parse_id(&body.interpreter_id, "interpreter_id")?;
    if body.category.trim().is_empty() {
        return Err(ApiError::Validation("Category is empty".to_string()));
    }
    state
        .orchestrator
        .invite_interpreter(cid, auth.user_id, iid, &body.category)
        .await?;
    Ok(Json(serde_json::json!({ "invited": true })))
}

pub async fn interpreter_respond(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<String>,
    Json(body): Json<RespondRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&call_id, "call_id")?;
    let credential = state
        .orchestrator
        .interpreter_respond(cid, auth.user_id, body.accept)
        .await?;

    Ok(Json(serde_json::json!({
        "accepted": body.accept,
        "credential": credential.map(credential_response),
    })))
}

pub async fn leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&call_id, "call_id")?;
    state.orchestrator.leave(cid, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "left": true })))
}

pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&call_id, "call_id")?;
    state.orchestrator.end(cid, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "ended": true })))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<CallResponse>, ApiError> {
    let cid = parse_id(&call_id, "call_id")?;
    let call = state.orchestrator.calls().find(cid).await?;
    Ok(Json(call_response(call)))
}

pub async fn roster(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(call_id): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let cid = parse_id(&call_id, "call_id")?;
    let participants = state.orchestrator.roster(cid).await?;
    Ok(Json(participants))
}
