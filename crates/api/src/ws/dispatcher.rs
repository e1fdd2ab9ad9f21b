use async_trait::async_trait;
use axum::extract::ws::Message;
use bson::oid::ObjectId;
use fairline_services::{ChannelEvent, ChannelPublisher};
use futures::SinkExt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{WsSender, WsStorage};

async fn send_all(senders: Vec<WsSender>, text: &str) {
    for sender in senders {
        let mut guard = sender.lock().await;
        if let Err(e) = guard.send(Message::text(text.to_string())).await {
            warn!(%e, "Failed to send WS message");
        }
    }
}

/// Multicasts a JSON message to every connection subscribed to a room.
pub async fn publish_room(storage: &WsStorage, room: &str, message: &serde_json::Value) {
    let text = serde_json::to_string(message).unwrap_or_default();
    debug!(%room, "WS room publish");
    send_all(storage.room_senders(room), &text).await;
}

/// Delivers a JSON message to every connection of one user.
pub async fn send_to_user(storage: &WsStorage, user_id: &ObjectId, message: &serde_json::Value) {
    let text = serde_json::to_string(message).unwrap_or_default();
    send_all(storage.user_senders(user_id), &text).await;
}

/// Delivers to a single connection.
pub async fn send_to_connection(
    storage: &WsStorage,
    connection_id: &str,
    message: &serde_json::Value,
) {
    let text = serde_json::to_string(message).unwrap_or_default();
    if let Some(sender) = storage.connection_sender(connection_id) {
        send_all(vec![sender], &text).await;
    }
}

/// The services' channel seam, backed by the WebSocket layer.
pub struct WsChannel {
    storage: Arc<WsStorage>,
}

impl WsChannel {
    pub fn new(storage: Arc<WsStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ChannelPublisher for WsChannel {
    async fn publish(&self, room: &str, event: &ChannelEvent) {
        match serde_json::to_value(event) {
            Ok(value) => publish_room(&self.storage, room, &value).await,
            Err(e) => warn!(%e, "Failed to serialize channel event"),
        }
    }

    async fn publish_to_user(&self, user_id: ObjectId, event: &ChannelEvent) {
        match serde_json::to_value(event) {
            Ok(value) => send_to_user(&self.storage, &user_id, &value).await,
            Err(e) => warn!(%e, "Failed to serialize channel event"),
        }
    }
}
