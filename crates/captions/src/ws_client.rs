use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, warn};

use crate::client::{StreamTag, Transcriber, TranscriberError, TranscriptEvent, TranscriptStream};

/// WebSocket client for the streaming transcription service: binary 16-bit
/// little-endian PCM frames up, JSON transcript events down.
pub struct WsTranscriber {
    endpoint: String,
    language: Option<String>,
    sample_rate: u32,
}

impl WsTranscriber {
    pub fn new(endpoint: String, language: Option<String>, sample_rate: u32) -> Self {
        Self {
            endpoint,
            language,
            sample_rate,
        }
    }

    fn stream_url(&self, tag: &StreamTag) -> String {
        let mut url = format!(
            "{}/v1/streams?call_id={}&room={}&participant_id={}&rate={}",
            self.endpoint.trim_end_matches('/'),
            tag.call_id,
            tag.room_name,
            tag.participant_id,
            self.sample_rate,
        );
        if let Some(lang) = &self.language {
            url.push_str("&lang=");
            url.push_str(lang);
        }
        url
    }
}

#[async_trait]
impl Transcriber for WsTranscriber {
    async fn open_stream(&self, tag: StreamTag) -> Result<TranscriptStream, TranscriberError> {
        let url = self.stream_url(&tag);
        let (socket, _) = connect_async(&url).await.map_err(|e| match &e {
            tungstenite::Error::Http(response) if response.status().is_client_error() => {
                TranscriberError::Misconfigured(format!("{}", response.status()))
            }
            other => TranscriberError::Unavailable(other.to_string()),
        })?;
        debug!(call_id = %tag.call_id, participant_id = %tag.participant_id, "Transcription stream opened");

        let (mut write, mut read) = socket.split();
        let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<i16>>(64);
        let (event_tx, event_rx) = mpsc::channel::<TranscriptEvent>(64);

        // Uplink: PCM frames until the empty end-of-stream marker.
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if frame.is_empty() {
                    let _ = write
                        .send(tungstenite::Message::text(r#"{"eos":true}"#.to_string()))
                        .await;
                    break;
                }
                let mut bytes = Vec::with_capacity(frame.len() * 2);
                for sample in frame {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                }
                if let Err(e) = write.send(tungstenite::Message::binary(bytes)).await {
                    warn!(%e, "Transcription uplink closed");
                    break;
                }
            }
            let _ = write.send(tungstenite::Message::Close(None)).await;
        });

        // Downlink: JSON transcript events until the service closes.
        let participant_id = tag.participant_id.clone();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(tungstenite::Message::Text(text)) => {
                        match serde_json::from_str::<TranscriptEvent>(text.as_str()) {
                            Ok(event) => {
                                if event_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(%participant_id, %e, "Unparseable transcript payload");
                            }
                        }
                    }
                    Ok(tungstenite::Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(%participant_id, %e, "Transcription downlink error");
                        break;
                    }
                }
            }
        });

        Ok(TranscriptStream {
            frames: frame_tx,
            events: event_rx,
        })
    }
}
