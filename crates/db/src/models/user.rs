use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Platform user. Account management lives outside this core; we read users
/// for display names, roster email matching and role checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    JobSeeker,
    Recruiter,
    Interpreter,
}

impl User {
    pub const COLLECTION: &'static str = "users";
}
