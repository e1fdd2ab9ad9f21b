use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use bson::oid::ObjectId;
use fairline_captions::CaptionError;
use fairline_services::channel::call_room;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{ActiveCapture, AppState};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // Verify JWT before accepting the WebSocket
    let claims = match state.auth.verify_access_token(&params.token) {
        Ok(c) => c,
        Err(_) => {
            return Response::builder()
                .status(401)
                .body("Unauthorized".into())
                .unwrap();
        }
    };

    let user_id = match ObjectId::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => {
            return Response::builder()
                .status(400)
                .body("Invalid user ID".into())
                .unwrap();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: ObjectId) {
    let connection_id = Uuid::new_v4().to_string();
    info!(?user_id, %connection_id, "WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    state
        .ws_storage
        .add(connection_id.clone(), user_id, sender.clone());

    {
        let msg = serde_json::json!({
            "type": "connected",
            "data": { "user_id": user_id.to_hex() },
        });
        let mut guard = sender.lock().await;
        let _ = guard
            .send(Message::text(msg.to_string()))
            .await;
    }

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &user_id, &connection_id, &text).await;
            }
            Ok(Message::Binary(bytes)) => {
                handle_audio_frame(&state, &connection_id, &bytes).await;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(?user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Disconnect cleanup: drop the connection's caption capture, if any, so
    // the session flushes and the participant's line clears for everyone.
    if let Some((_, capture)) = state.captures.remove(&connection_id) {
        let _ = state
            .captions
            .disable(&capture.call_id, &user_id.to_hex());
    }
    state.ws_storage.remove(&connection_id);

    info!(?user_id, %connection_id, "WebSocket disconnected");
}

async fn handle_client_message(
    state: &AppState,
    user_id: &ObjectId,
    connection_id: &str,
    text: &str,
) {
    let parsed: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return,
    };

    let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let data = parsed.get("data");

    debug!(?user_id, %connection_id, msg_type, "WS message received");

    match msg_type {
        "ping" => {
            let pong = serde_json::json!({ "type": "pong" });
            super::dispatcher::send_to_connection(&state.ws_storage, connection_id, &pong).await;
        }
        "subscribe" => {
            if let Some(room) = data.and_then(|d| d.get("room")).and_then(|r| r.as_str()) {
                if may_subscribe(state, user_id, room).await {
                    state.ws_storage.subscribe(room, connection_id);
                }
            }
        }
        "unsubscribe" => {
            if let Some(room) = data.and_then(|d| d.get("room")).and_then(|r| r.as_str()) {
                state.ws_storage.unsubscribe(room, connection_id);
            }
        }
        "caption:enable" => {
            handle_caption_enable(state, user_id, connection_id, data).await;
        }
        "caption:disable" => {
            handle_caption_disable(state, user_id, connection_id).await;
        }
        "caption:local_result" => {
            handle_caption_local_result(state, user_id, data).await;
        }
        _ => {
            debug!(?user_id, msg_type, "Unknown WS message type");
        }
    }
}

/// Rooms are server-defined names only; free-form subscriptions are refused.
/// Booth rooms are open to any signed-in user (waiting attendees watch them
/// before they hold any entry), call rooms only to the call's participants.
async fn may_subscribe(state: &AppState, user_id: &ObjectId, room: &str) -> bool {
    match room.split_once(':') {
        Some(("booth", id)) => ObjectId::parse_str(id).is_ok(),
        Some(("call", id)) => {
            let Ok(call_id) = ObjectId::parse_str(id) else {
                return false;
            };
            match state.orchestrator.calls().find(call_id).await {
                Ok(call) => call.has_participant(*user_id),
                Err(_) => false,
            }
        }
        _ => false,
    }
}

async fn send_caption_error(
    state: &AppState,
    connection_id: &str,
    call_id: &str,
    kind: &str,
    message: &str,
    fallback: bool,
) {
    let msg = serde_json::json!({
        "type": "caption:error",
        "data": {
            "call_id": call_id,
            "kind": kind,
            "message": message,
            "fallback": fallback,
        }
    });
    super::dispatcher::send_to_connection(&state.ws_storage, connection_id, &msg).await;
}

/// Starts a caption session for this connection. Errors go back to the
/// enabling participant only; an unreachable transcription service tells the
/// client to use its local recognizer instead.
async fn handle_caption_enable(
    state: &AppState,
    user_id: &ObjectId,
    connection_id: &str,
    data: Option<&serde_json::Value>,
) {
    let call_id_str = match data.and_then(|d| d.get("call_id")).and_then(|c| c.as_str()) {
        Some(s) => s.to_string(),
        None => return,
    };
    let muted = data
        .and_then(|d| d.get("muted"))
        .and_then(|m| m.as_bool())
        .unwrap_or(false);

    // A muted participant produces no audio worth captioning.
    if muted {
        send_caption_error(
            state,
            connection_id,
            &call_id_str,
            "muted",
            "Unmute to enable captions",
            false,
        )
        .await;
        return;
    }

    let call_id = match ObjectId::parse_str(&call_id_str) {
        Ok(id) => id,
        Err(_) => return,
    };
    let call = match state.orchestrator.calls().find(call_id).await {
        Ok(c) => c,
        Err(_) => {
            send_caption_error(
                state,
                connection_id,
                &call_id_str,
                "not_found",
                "Call not found",
                false,
            )
            .await;
            return;
        }
    };
    if !call.has_participant(*user_id) {
        send_caption_error(
            state,
            connection_id,
            &call_id_str,
            "permission_denied",
            "Not a participant of this call",
            false,
        )
        .await;
        return;
    }

    let participant_id = user_id.to_hex();
    let participant_name = state.users.display_name(*user_id).await;

    match state
        .captions
        .enable(&call_id_str, &call.room_name, &participant_id, &participant_name)
        .await
    {
        Ok(sink) => {
            state.captures.insert(
                connection_id.to_string(),
                ActiveCapture {
                    call_id: call_id_str.clone(),
                    sink,
                },
            );
            let ack = serde_json::json!({
                "type": "caption:enabled",
                "data": { "call_id": call_id_str },
            });
            super::dispatcher::send_to_connection(&state.ws_storage, connection_id, &ack).await;
        }
        Err(CaptionError::AlreadyCapturing) => {
            send_caption_error(
                state,
                connection_id,
                &call_id_str,
                "invalid_state",
                "Captions already enabled",
                false,
            )
            .await;
        }
        Err(e) => {
            warn!(%call_id_str, %participant_id, %e, "Caption enable failed");
            send_caption_error(
                state,
                connection_id,
                &call_id_str,
                "transcription_unavailable",
                &e.to_string(),
                true,
            )
            .await;
        }
    }
}

async fn handle_caption_disable(state: &AppState, user_id: &ObjectId, connection_id: &str) {
    let Some((_, capture)) = state.captures.remove(connection_id) else {
        return;
    };
    if let Err(e) = state
        .captions
        .disable(&capture.call_id, &user_id.to_hex())
    {
        debug!(?user_id, %e, "Caption disable on inactive session");
    }
}

/// Fallback path: a client running its local recognizer relays results here
/// so the rest of the call still sees that participant's captions.
async fn handle_caption_local_result(
    state: &AppState,
    user_id: &ObjectId,
    data: Option<&serde_json::Value>,
) {
    let Some(data) = data else { return };
    let Some(call_id_str) = data.get("call_id").and_then(|c| c.as_str()) else {
        return;
    };
    let Ok(call_id) = ObjectId::parse_str(call_id_str) else {
        return;
    };
    // Only the call's own participants may speak for it.
    match state.orchestrator.calls().find(call_id).await {
        Ok(call) if call.has_participant(*user_id) => {}
        _ => {
            debug!(?user_id, %call_id_str, "Local caption from non-participant dropped");
            return;
        }
    }
    let text = data.get("text").and_then(|t| t.as_str()).unwrap_or("");
    let is_final = data
        .get("is_final")
        .and_then(|f| f.as_bool())
        .unwrap_or(false);

    let participant_name = state.users.display_name(*user_id).await;
    let event = serde_json::json!({
        "type": "caption:transcription",
        "data": {
            "call_id": call_id_str,
            "participant_id": user_id.to_hex(),
            "participant_name": participant_name,
            "text": text,
            "is_final": is_final,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        }
    });
    super::dispatcher::publish_room(&state.ws_storage, &call_room(call_id), &event).await;
}

/// Raw captured audio: 32-bit float little-endian mono samples at 48 kHz.
async fn handle_audio_frame(state: &AppState, connection_id: &str, bytes: &[u8]) {
    // Clone the sink out of the map entry; holding the guard across the
    // send would block other tasks touching the same shard while a slow
    // transcriber backs the channel up.
    let Some(sink) = state
        .captures
        .get(connection_id)
        .map(|capture| capture.sink.clone())
    else {
        return;
    };
    if bytes.len() % 4 != 0 {
        return;
    }
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    if sink.send(samples).await.is_err() {
        // Session ended server-side; stop accepting frames.
        state.captures.remove(connection_id);
    }
}
