use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A recruiter-staffed virtual station attendees queue at. Created by admin
/// tooling; this core reads it and updates the serving number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booth {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub event_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub recruiter_ids: Vec<ObjectId>,
    /// Recruiter-editable "now serving" number. Monotonic by intent only;
    /// never enforced.
    #[serde(default)]
    pub serving_number: i64,
    pub logo_url: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Booth {
    pub const COLLECTION: &'static str = "booths";
}
