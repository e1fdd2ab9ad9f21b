use axum::extract::ws::{Message, WebSocket};
use bson::oid::ObjectId;
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

struct Connection {
    user_id: ObjectId,
    sender: WsSender,
}

/// Tracks live WebSocket connections and their room subscriptions.
///
/// A user can hold several connections (multiple tabs); each connection can
/// subscribe to any number of named rooms (`booth:<id>`, `call:<id>`).
pub struct WsStorage {
    connections: DashMap<String, Connection>,
    rooms: DashMap<String, Vec<String>>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    pub fn add(&self, connection_id: String, user_id: ObjectId, sender: WsSender) {
        self.connections
            .insert(connection_id, Connection { user_id, sender });
    }

    /// Drops the connection and purges it from every room.
    pub fn remove(&self, connection_id: &str) {
        self.connections.remove(connection_id);
        self.rooms.retain(|_, members| {
            members.retain(|c| c != connection_id);
            !members.is_empty()
        });
    }

    /// Idempotent; subscribing twice keeps a single membership.
    pub fn subscribe(&self, room: &str, connection_id: &str) {
        let mut members = self.rooms.entry(room.to_string()).or_default();
        if !members.iter().any(|c| c == connection_id) {
            members.push(connection_id.to_string());
        }
    }

    pub fn unsubscribe(&self, room: &str, connection_id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.retain(|c| c != connection_id);
            if members.is_empty() {
                drop(members);
                self.rooms.remove(room);
            }
        }
    }

    pub fn room_senders(&self, room: &str) -> Vec<WsSender> {
        let Some(members) = self.rooms.get(room) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|c| self.connections.get(c).map(|conn| conn.sender.clone()))
            .collect()
    }

    pub fn user_senders(&self, user_id: &ObjectId) -> Vec<WsSender> {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id == *user_id)
            .map(|entry| entry.value().sender.clone())
            .collect()
    }

    pub fn connection_sender(&self, connection_id: &str) -> Option<WsSender> {
        self.connections
            .get(connection_id)
            .map(|conn| conn.sender.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
