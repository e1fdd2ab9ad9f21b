use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A message exchanged between a waiting job seeker and the booth's
/// recruiter. Append-only; owned by the queue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub queue_entry_id: ObjectId,
    #[serde(default)]
    pub kind: QueueMessageKind,
    pub content: String,
    pub sender: MessageSender,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueMessageKind {
    #[default]
    Text,
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    JobSeeker,
    Recruiter,
}

impl QueueMessage {
    pub const COLLECTION: &'static str = "queue_messages";
}
