use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One attendee's waiting-list record for a booth.
///
/// At most one non-terminal entry may exist per (booth, job seeker); that is
/// enforced by a partial unique index. `position` is assigned once under the
/// booth's serializer and never renumbered, so gaps appear after removals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub booth_id: ObjectId,
    pub job_seeker_id: ObjectId,
    pub position: i64,
    pub interpreter_category: Option<String>,
    #[serde(default)]
    pub status: QueueEntryStatus,
    pub joined_at: DateTime,
    #[serde(default)]
    pub message_count: i64,
    /// Messages the recruiter has not opened yet.
    #[serde(default)]
    pub unread_from_job_seeker: i64,
    /// Messages the job seeker has not opened yet.
    #[serde(default)]
    pub unread_from_recruiter: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueEntryStatus {
    #[default]
    Waiting,
    InMeeting,
    LeftWithMessage,
    Removed,
}

impl QueueEntryStatus {
    /// Terminal entries no longer occupy the (booth, job seeker) slot.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LeftWithMessage | Self::Removed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InMeeting => "in_meeting",
            Self::LeftWithMessage => "left_with_message",
            Self::Removed => "removed",
        }
    }
}

impl QueueEntry {
    pub const COLLECTION: &'static str = "queue_entries";
}
