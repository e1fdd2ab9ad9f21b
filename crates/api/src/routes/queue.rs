use axum::{
    Json,
    extract::{Path, State},
};
use bson::oid::ObjectId;
use fairline_db::models::{MessageSender, QueueEntry, QueueMessage, QueueMessageKind};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// E.g. "ASL"; present when the attendee will need an interpreter.
    pub interpreter_category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveMessageRequest {
    #[serde(default)]
    pub kind: QueueMessageKind,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub kind: QueueMessageKind,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ServingRequest {
    pub serving_number: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub queue_entry_id: String,
    pub booth_id: String,
    pub position: i64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub queue_entry_id: String,
    pub kind: QueueMessageKind,
    pub content: String,
    pub sender: MessageSender,
    pub is_read: bool,
    pub created_at: i64,
}

fn parse_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

fn entry_response(entry: QueueEntry) -> EntryResponse {
    EntryResponse {
        queue_entry_id: entry.id.map(|id| id.to_hex()).unwrap_or_default(),
        booth_id: entry.booth_id.to_hex(),
        position: entry.position,
        status: entry.status.as_str().to_string(),
    }
}

fn message_response(m: QueueMessage) -> MessageResponse {
    MessageResponse {
        id: m.id.map(|id| id.to_hex()).unwrap_or_default(),
        queue_entry_id: m.queue_entry_id.to_hex(),
        kind: m.kind,
        content: m.content,
        sender: m.sender,
        is_read: m.is_read,
        created_at: m.created_at.timestamp_millis(),
    }
}

/// Which side of an entry's thread the caller is on.
async fn thread_side(
    state: &AppState,
    entry_id: ObjectId,
    user_id: ObjectId,
) -> Result<MessageSender, ApiError> {
    let entry = state.queue.dao().find_entry(entry_id).await?;
    if state.booths.is_recruiter(entry.booth_id, user_id).await? {
        return Ok(MessageSender::Recruiter);
    }
    if entry.job_seeker_id == user_id {
        return Ok(MessageSender::JobSeeker);
    }
    Err(ApiError::Forbidden("Not a party to this thread".to_string()))
}

pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booth_id): Path<String>,
    Json(body): Json<JoinRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let bid = parse_id(&booth_id, "booth_id")?;
    let entry = state
        .queue
        .join(bid, auth.user_id, body.interpreter_category)
        .await?;
    Ok(Json(entry_response(entry)))
}

pub async fn leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booth_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bid = parse_id(&booth_id, "booth_id")?;
    state.queue.leave(bid, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "left": true })))
}

pub async fn leave_with_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booth_id): Path<String>,
    Json(body): Json<LeaveMessageRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let bid = parse_id(&booth_id, "booth_id")?;
    if body.content.trim().is_empty() {
        return Err(ApiError::Validation("Message content is empty".to_string()));
    }
    let entry = state
        .queue
        .leave_with_message(bid, auth.user_id, body.kind, body.content)
        .await?;
    Ok(Json(entry_response(entry)))
}

pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booth_id): Path<String>,
) -> Result<Json<fairline_services::queue::QueueStatus>, ApiError> {
    let bid = parse_id(&booth_id, "booth_id")?;
    let status = state.queue.queue_status(bid, auth.user_id).await?;
    Ok(Json(status))
}

/// Recruiter's live queue for their booth.
pub async fn booth_queue(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booth_id): Path<String>,
) -> Result<Json<Vec<fairline_services::queue::BoothQueueItem>>, ApiError> {
    let bid = parse_id(&booth_id, "booth_id")?;
    if !state.booths.is_recruiter(bid, auth.user_id).await? {
        return Err(ApiError::Forbidden("Not a recruiter of this booth".to_string()));
    }
    let items = state.queue.booth_queue(bid).await?;
    Ok(Json(items))
}

pub async fn update_serving(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(booth_id): Path<String>,
    Json(body): Json<ServingRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bid = parse_id(&booth_id, "booth_id")?;
    if !state.booths.is_recruiter(bid, auth.user_id).await? {
        return Err(ApiError::Forbidden("Not a recruiter of this booth".to_string()));
    }
    state.queue.update_serving_number(bid, body.serving_number).await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<String>,
    Json(body): Json<RemoveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let eid = parse_id(&entry_id, "queue_entry_id")?;
    let entry = state.queue.dao().find_entry(eid).await?;
    if !state.booths.is_recruiter(entry.booth_id, auth.user_id).await? {
        return Err(ApiError::Forbidden("Not a recruiter of this booth".to_string()));
    }
    let reason = body.reason.unwrap_or_else(|| "removed by recruiter".to_string());
    state.queue.remove(eid, &reason).await?;
    Ok(Json(serde_json::json!({ "removed": true })))
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<String>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let eid = parse_id(&entry_id, "queue_entry_id")?;
    if body.content.trim().is_empty() {
        return Err(ApiError::Validation("Message content is empty".to_string()));
    }
    let sender = thread_side(&state, eid, auth.user_id).await?;
    let message = state
        .queue
        .send_message(eid, body.kind, body.content, sender)
        .await?;
    Ok(Json(message_response(message)))
}

/// Opens the thread, which also marks the counterpart's messages read.
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(entry_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let eid = parse_id(&entry_id, "queue_entry_id")?;
    let reader = thread_side(&state, eid, auth.user_id).await?;
    let messages = state.queue.open_thread(eid, reader).await?;
    Ok(Json(messages.into_iter().map(message_response).collect()))
}
