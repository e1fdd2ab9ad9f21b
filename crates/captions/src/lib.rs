pub mod client;
pub mod engine;
pub mod pipeline;
mod worker;
mod ws_client;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{StreamTag, Transcriber, TranscriberError, TranscriptEvent, TranscriptStream};
pub use engine::{AudioSink, CaptionEngine};
pub use ws_client::WsTranscriber;

/// One caption line as broadcast to a call's participants. Interim events
/// (`is_final = false`) overwrite the participant's displayed line; an empty
/// final event clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionEvent {
    pub call_id: String,
    pub participant_id: String,
    pub participant_name: String,
    pub text: String,
    pub is_final: bool,
    /// Unix millis.
    pub timestamp: i64,
}

#[derive(Debug, Error)]
pub enum CaptionError {
    /// The transcription service could not be reached; clients should fall
    /// back to their local recognizer.
    #[error("transcription service unavailable: {0}")]
    Unavailable(String),
    /// Client-actionable misconfiguration, surfaced once to the enabling
    /// participant only.
    #[error("transcription service misconfigured: {0}")]
    Misconfigured(String),
    #[error("captions already enabled for this participant")]
    AlreadyCapturing,
    #[error("captions are not enabled for this participant")]
    NotCapturing,
}
