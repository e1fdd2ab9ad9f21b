use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A live or pending video meeting tied to exactly one queue entry.
///
/// `ended` is terminal and irreversible; ending consumes the originating
/// queue entry's slot (the entry is never returned to `waiting`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_name: String,
    pub booth_id: ObjectId,
    pub event_id: ObjectId,
    pub queue_entry_id: ObjectId,
    pub recruiter_id: ObjectId,
    pub job_seeker_id: ObjectId,
    #[serde(default)]
    pub interpreters: Vec<CallInterpreter>,
    #[serde(default)]
    pub state: CallState,
    pub created_at: DateTime,
    pub ended_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInterpreter {
    pub interpreter_id: ObjectId,
    pub category: String,
    pub status: InterpreterStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterStatus {
    Invited,
    Joined,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    Created,
    Active,
    Ended,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

impl Call {
    pub const COLLECTION: &'static str = "calls";

    /// Recruiter, attendee, or an interpreter who accepted their invitation.
    pub fn has_participant(&self, user_id: ObjectId) -> bool {
        self.recruiter_id == user_id
            || self.job_seeker_id == user_id
            || self
                .interpreters
                .iter()
                .any(|s| s.interpreter_id == user_id && s.status == InterpreterStatus::Joined)
    }
}
