use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::client::{StreamTag, Transcriber, TranscriberError};
use crate::worker::SessionWorker;
use crate::{CaptionError, CaptionEvent};

/// Per-call, per-participant caption sessions.
///
/// Sessions are keyed by `call_id:participant_id` so simultaneous speakers
/// never overwrite each other. The engine is created once at startup and
/// shared via `Arc`; the API layer subscribes to the broadcast side and
/// relays events into the call's channel room.
pub struct CaptionEngine {
    transcriber: Arc<dyn Transcriber>,
    sessions: DashMap<String, SessionHandle>,
    events_tx: broadcast::Sender<CaptionEvent>,
}

struct SessionHandle {
    audio_tx: mpsc::Sender<Vec<f32>>,
    participant_name: String,
    last_chunk_at: Arc<AtomicI64>,
}

/// Where a participant's captured audio goes. Dropping every clone ends the
/// session's stream.
pub type AudioSink = mpsc::Sender<Vec<f32>>;

fn session_key(call_id: &str, participant_id: &str) -> String {
    format!("{call_id}:{participant_id}")
}

impl CaptionEngine {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(256);
        Arc::new(Self {
            transcriber,
            sessions: DashMap::new(),
            events_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptionEvent> {
        self.events_tx.subscribe()
    }

    /// Starts capturing for one participant. The returned sink takes 48 kHz
    /// mono f32 chunks.
    pub async fn enable(
        &self,
        call_id: &str,
        room_name: &str,
        participant_id: &str,
        participant_name: &str,
    ) -> Result<AudioSink, CaptionError> {
        let key = session_key(call_id, participant_id);
        if self.sessions.contains_key(&key) {
            return Err(CaptionError::AlreadyCapturing);
        }

        let tag = StreamTag {
            call_id: call_id.to_string(),
            room_name: room_name.to_string(),
            participant_id: participant_id.to_string(),
        };
        let stream = self
            .transcriber
            .open_stream(tag.clone())
            .await
            .map_err(|e| match e {
                TranscriberError::Unavailable(msg) => CaptionError::Unavailable(msg),
                TranscriberError::Misconfigured(msg) => CaptionError::Misconfigured(msg),
            })?;

        let (audio_tx, audio_rx) = mpsc::channel::<Vec<f32>>(64);
        let last_chunk_at = Arc::new(AtomicI64::new(chrono::Utc::now().timestamp_millis()));

        let worker = SessionWorker::new(
            tag,
            participant_name.to_string(),
            stream,
            audio_rx,
            self.events_tx.clone(),
            last_chunk_at.clone(),
        );
        tokio::spawn(worker.run());

        self.sessions.insert(
            key,
            SessionHandle {
                audio_tx: audio_tx.clone(),
                participant_name: participant_name.to_string(),
                last_chunk_at,
            },
        );
        info!(%call_id, %participant_id, "Caption session started");

        Ok(audio_tx)
    }

    pub fn is_capturing(&self, call_id: &str, participant_id: &str) -> bool {
        self.sessions
            .contains_key(&session_key(call_id, participant_id))
    }

    pub fn last_chunk_at(&self, call_id: &str, participant_id: &str) -> Option<i64> {
        self.sessions
            .get(&session_key(call_id, participant_id))
            .map(|s| s.last_chunk_at.load(Ordering::Relaxed))
    }

    /// Stops capturing and clears the participant's caption line for
    /// everyone (empty final event).
    pub fn disable(&self, call_id: &str, participant_id: &str) -> Result<(), CaptionError> {
        let key = session_key(call_id, participant_id);
        let Some((_, session)) = self.sessions.remove(&key) else {
            return Err(CaptionError::NotCapturing);
        };
        debug!(%call_id, %participant_id, "Caption session stopped");

        // Dropping the sink closes the audio channel; the worker flushes and
        // sends the end-of-stream marker.
        drop(session.audio_tx);

        let _ = self.events_tx.send(CaptionEvent {
            call_id: call_id.to_string(),
            participant_id: participant_id.to_string(),
            participant_name: session.participant_name,
            text: String::new(),
            is_final: true,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });
        Ok(())
    }

    /// Call-ended teardown: every session of the call.
    pub fn end_call(&self, call_id: &str) {
        let prefix = format!("{call_id}:");
        let keys: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            if let Some(participant_id) = key.strip_prefix(&prefix) {
                let _ = self.disable(call_id, &participant_id.to_string());
            }
        }
        info!(%call_id, "Caption sessions torn down");
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
