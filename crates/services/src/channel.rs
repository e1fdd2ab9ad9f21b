use async_trait::async_trait;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Events pushed out over the realtime channel.
///
/// Serialized as `{"type": "...", "data": {...}}` so clients can switch on
/// the tag without touching the payload. Ids are hex strings on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChannelEvent {
    /// The booth's waiting list changed (join, invite, removal).
    #[serde(rename = "queue:updated")]
    QueueUpdated { booth_id: String },
    /// A specific attendee's position bookkeeping, sent to that attendee.
    #[serde(rename = "queue:position_updated")]
    QueuePositionUpdated {
        booth_id: String,
        queue_entry_id: String,
        position: i64,
    },
    /// Recruiter moved the "now serving" number; waiting clients compute
    /// "you are next" locally from this.
    #[serde(rename = "queue:serving_updated")]
    QueueServingUpdated { booth_id: String, serving_number: i64 },
    /// Badge notification only; the thread itself is fetched separately.
    #[serde(rename = "queue:new_message")]
    QueueNewMessage {
        queue_entry_id: String,
        booth_id: String,
        sender: String,
    },
    #[serde(rename = "queue:left_with_message")]
    QueueLeftWithMessage {
        booth_id: String,
        queue_entry_id: String,
        job_seeker_id: String,
    },
    /// Recruiter-forced removal; the attendee's client redirects away from
    /// the waiting view on receipt.
    #[serde(rename = "queue:removed")]
    QueueRemoved {
        booth_id: String,
        queue_entry_id: String,
        reason: String,
    },
    #[serde(rename = "call:invitation")]
    CallInvitation {
        call_id: String,
        booth_id: String,
        room_name: String,
        recruiter_id: String,
        credential: String,
    },
    #[serde(rename = "call:interpreter_invitation")]
    InterpreterInvitation {
        call_id: String,
        category: String,
        recruiter_id: String,
    },
    /// System chat message for the call on interpreter accept/decline.
    #[serde(rename = "call:interpreter_response")]
    InterpreterResponse {
        call_id: String,
        interpreter_id: String,
        category: String,
        accepted: bool,
        message: String,
    },
    /// Every client runs its own local media teardown on receipt.
    #[serde(rename = "call:ended")]
    CallEnded { call_id: String, room_name: String },
    #[serde(rename = "call:participant_left")]
    ParticipantLeft {
        call_id: String,
        participant_id: String,
    },
    /// Reconciled participant list, pushed whenever transport presence moves.
    #[serde(rename = "call:roster")]
    RosterUpdated {
        call_id: String,
        participants: Vec<serde_json::Value>,
    },
    #[serde(rename = "caption:transcription")]
    CaptionTranscription {
        call_id: String,
        participant_id: String,
        participant_name: String,
        text: String,
        is_final: bool,
        timestamp: i64,
    },
    /// Sent only to the participant who tried to enable captions.
    #[serde(rename = "caption:error")]
    CaptionError {
        call_id: String,
        kind: String,
        message: String,
        /// True when the client should switch to its local recognizer.
        fallback: bool,
    },
}

/// Abstract realtime channel the services publish through. The API crate
/// implements it over the WebSocket layer; tests capture events in memory.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Multicast to everyone subscribed to a named room.
    async fn publish(&self, room: &str, event: &ChannelEvent);
    /// Deliver to every connection of a single user.
    async fn publish_to_user(&self, user_id: ObjectId, event: &ChannelEvent);
}

/// Room every client watching a booth subscribes to (recruiters and
/// waiting attendees alike).
pub fn booth_room(booth_id: ObjectId) -> String {
    format!("booth:{}", booth_id.to_hex())
}

/// Room scoped to one call's participants.
pub fn call_room(call_id: ObjectId) -> String {
    format!("call:{}", call_id.to_hex())
}
