use std::collections::HashMap;

use bson::oid::ObjectId;
use fairline_db::models::{Call, InterpreterStatus};
use serde::Serialize;

/// The reconciled participant list of one call.
///
/// Transport identities are the domain user id verbatim (set at
/// credential-mint time), so reconciliation is an exact lookup: a presence
/// report either flips a known entry's `connected` flag or, for an identity
/// this call never minted, adds a generic participant. Nothing is dropped
/// silently and nothing is fuzzy-matched.
#[derive(Debug, Clone)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub user_id: Option<ObjectId>,
    /// Transport identity; equals the user id hex for domain participants.
    pub identity: String,
    pub display_name: String,
    pub role: RosterRole,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterRole {
    Recruiter,
    JobSeeker,
    Interpreter,
    Guest,
}

impl Roster {
    /// Seeds the roster from the call record: recruiter, job seeker, and any
    /// interpreters that have joined. `names` maps user ids to display names.
    pub fn from_call(call: &Call, names: &HashMap<ObjectId, String>) -> Self {
        let name_of = |id: &ObjectId| {
            names
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.to_hex()[..8].to_string())
        };

        let mut entries = vec![
            RosterEntry {
                user_id: Some(call.recruiter_id),
                identity: call.recruiter_id.to_hex(),
                display_name: name_of(&call.recruiter_id),
                role: RosterRole::Recruiter,
                connected: false,
            },
            RosterEntry {
                user_id: Some(call.job_seeker_id),
                identity: call.job_seeker_id.to_hex(),
                display_name: name_of(&call.job_seeker_id),
                role: RosterRole::JobSeeker,
                connected: false,
            },
        ];

        for interpreter in &call.interpreters {
            if interpreter.status == InterpreterStatus::Joined {
                entries.push(RosterEntry {
                    user_id: Some(interpreter.interpreter_id),
                    identity: interpreter.interpreter_id.to_hex(),
                    display_name: name_of(&interpreter.interpreter_id),
                    role: RosterRole::Interpreter,
                    connected: false,
                });
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn contains_user(&self, user_id: ObjectId) -> bool {
        self.entries.iter().any(|e| e.user_id == Some(user_id))
    }

    /// Adds a joined interpreter after an accepted invitation.
    pub fn add_interpreter(&mut self, interpreter_id: ObjectId, display_name: String) {
        if self.contains_user(interpreter_id) {
            return;
        }
        self.entries.push(RosterEntry {
            user_id: Some(interpreter_id),
            identity: interpreter_id.to_hex(),
            display_name,
            role: RosterRole::Interpreter,
            connected: false,
        });
    }

    /// Marks the entry with this exact transport identity present. Returns
    /// `false` if the identity is unknown to this call.
    pub fn mark_present(&mut self, identity: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.identity == identity) {
            Some(entry) => {
                entry.connected = true;
                true
            }
            None => false,
        }
    }

    /// Secondary exact match for externally-provisioned identities whose
    /// user was resolved by email.
    pub fn mark_present_by_user(&mut self, user_id: ObjectId) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.user_id == Some(user_id))
        {
            Some(entry) => {
                entry.connected = true;
                true
            }
            None => false,
        }
    }

    /// Unmatched presence still shows up, as a generic participant.
    pub fn add_guest(&mut self, identity: &str, display_name: &str) {
        self.entries.push(RosterEntry {
            user_id: None,
            identity: identity.to_string(),
            display_name: display_name.to_string(),
            role: RosterRole::Guest,
            connected: true,
        });
    }

    pub fn mark_absent(&mut self, identity: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.identity == identity) {
            Some(entry) => {
                entry.connected = false;
                true
            }
            None => false,
        }
    }

    pub fn to_json(&self) -> Vec<serde_json::Value> {
        self.entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "user_id": e.user_id.map(|id| id.to_hex()),
                    "identity": e.identity,
                    "display_name": e.display_name,
                    "role": e.role,
                    "connected": e.connected,
                })
            })
            .collect()
    }
}
