use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fairline_captions::CaptionError;
use fairline_services::call::CallError;
use fairline_services::dao::base::DaoError;
use fairline_services::media::TransportError;
use fairline_services::queue::QueueError;
use serde::Serialize;

use crate::auth::AuthError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    AlreadyQueued(String),
    InvalidState(String),
    RecruiterBusy(String),
    TransportUnavailable(String),
    TranscriptionUnavailable(String),
    Internal(String),
    Validation(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "permission_denied", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::AlreadyQueued(msg) => (StatusCode::CONFLICT, "already_queued", msg),
            ApiError::InvalidState(msg) => (StatusCode::CONFLICT, "invalid_state", msg),
            ApiError::RecruiterBusy(msg) => (StatusCode::CONFLICT, "recruiter_busy", msg),
            ApiError::TransportUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, "transport_unavailable", msg)
            }
            ApiError::TranscriptionUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "transcription_unavailable",
                msg,
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            DaoError::DuplicateKey(msg) => ApiError::Conflict(msg),
            DaoError::Mongo(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonSer(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonDe(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::AlreadyQueued => {
                ApiError::AlreadyQueued("Already queued at this booth".to_string())
            }
            QueueError::InvalidState(msg) => ApiError::InvalidState(msg.to_string()),
            QueueError::NotFound => ApiError::NotFound("Queue entry not found".to_string()),
            QueueError::Dao(e) => e.into(),
        }
    }
}

impl From<CallError> for ApiError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::InvalidState(msg) => ApiError::InvalidState(msg.to_string()),
            CallError::NotFound => ApiError::NotFound("Call not found".to_string()),
            CallError::RecruiterBusy => {
                ApiError::RecruiterBusy("Recruiter already has a live call".to_string())
            }
            CallError::Conflict(msg) => ApiError::Conflict(msg.to_string()),
            CallError::PermissionDenied(msg) => ApiError::Forbidden(msg.to_string()),
            CallError::Transport(e) => e.into(),
            CallError::Queue(e) => e.into(),
            CallError::Dao(e) => e.into(),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable(msg) => ApiError::TransportUnavailable(msg),
            TransportError::Provider(msg) => ApiError::TransportUnavailable(msg),
        }
    }
}

impl From<CaptionError> for ApiError {
    fn from(err: CaptionError) -> Self {
        match err {
            CaptionError::Unavailable(msg) => ApiError::TranscriptionUnavailable(msg),
            CaptionError::Misconfigured(msg) => ApiError::TranscriptionUnavailable(msg),
            CaptionError::AlreadyCapturing => {
                ApiError::InvalidState("Captions already enabled".to_string())
            }
            CaptionError::NotCapturing => {
                ApiError::InvalidState("Captions are not enabled".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}
