use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Identifies one audio stream to the transcription service.
#[derive(Debug, Clone)]
pub struct StreamTag {
    pub call_id: String,
    pub room_name: String,
    pub participant_id: String,
}

/// A transcript fragment from the service. Timestamps are service-side when
/// provided, filled in locally otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
}

#[derive(Debug, Error)]
pub enum TranscriberError {
    #[error("transcriber unavailable: {0}")]
    Unavailable(String),
    #[error("transcriber rejected the stream: {0}")]
    Misconfigured(String),
}

/// An open per-participant stream. `frames` takes 16 kHz mono i16 PCM; an
/// empty frame is the end-of-stream marker.
pub struct TranscriptStream {
    pub frames: mpsc::Sender<Vec<i16>>,
    pub events: mpsc::Receiver<TranscriptEvent>,
}

/// The external streaming transcription service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn open_stream(&self, tag: StreamTag) -> Result<TranscriptStream, TranscriberError>;
}
