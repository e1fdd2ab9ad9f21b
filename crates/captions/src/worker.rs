use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::client::TranscriptStream;
use crate::pipeline::{FRAME_SAMPLES, FrameChunker, Resampler, f32_to_i16};
use crate::{CaptionEvent, client::StreamTag};

/// One participant's capture session: audio in, transcript events out.
///
/// The audio side resamples to 16 kHz mono i16 and forwards fixed-size
/// frames; the event side stamps and fans transcripts out on the engine's
/// broadcast channel. Both ends shut down when the audio channel closes.
pub struct SessionWorker {
    tag: StreamTag,
    participant_name: String,
    stream: TranscriptStream,
    audio_rx: mpsc::Receiver<Vec<f32>>,
    events_tx: broadcast::Sender<CaptionEvent>,
    last_chunk_at: Arc<AtomicI64>,
}

impl SessionWorker {
    pub fn new(
        tag: StreamTag,
        participant_name: String,
        stream: TranscriptStream,
        audio_rx: mpsc::Receiver<Vec<f32>>,
        events_tx: broadcast::Sender<CaptionEvent>,
        last_chunk_at: Arc<AtomicI64>,
    ) -> Self {
        Self {
            tag,
            participant_name,
            stream,
            audio_rx,
            events_tx,
            last_chunk_at,
        }
    }

    pub async fn run(mut self) {
        let mut resampler = match Resampler::new() {
            Ok(r) => r,
            Err(e) => {
                warn!(participant_id = %self.tag.participant_id, %e, "Resampler init failed");
                return;
            }
        };
        let mut chunker = FrameChunker::new(FRAME_SAMPLES);

        loop {
            tokio::select! {
                audio = self.audio_rx.recv() => match audio {
                    Some(samples) => {
                        self.last_chunk_at
                            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
                        match resampler.process(&samples) {
                            Ok(resampled) => {
                                for frame in chunker.push(&f32_to_i16(&resampled)) {
                                    if self.stream.frames.send(frame).await.is_err() {
                                        debug!(participant_id = %self.tag.participant_id, "Transcriber sink closed");
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                warn!(participant_id = %self.tag.participant_id, %e, "Resample failed");
                            }
                        }
                    }
                    // Disable path: flush, signal end-of-stream, then drain
                    // any trailing transcripts.
                    None => break,
                },
                event = self.stream.events.recv() => match event {
                    Some(event) => self.broadcast(event),
                    None => return,
                },
            }
        }

        if let Ok(tail) = resampler.flush() {
            let mut frames = chunker.push(&f32_to_i16(&tail));
            if let Some(last) = chunker.flush() {
                frames.push(last);
            }
            for frame in frames {
                if self.stream.frames.send(frame).await.is_err() {
                    return;
                }
            }
        }
        // Empty frame is the end-of-stream marker.
        let _ = self.stream.frames.send(Vec::new()).await;

        while let Some(event) = self.stream.events.recv().await {
            self.broadcast(event);
        }
    }

    fn broadcast(&self, event: crate::client::TranscriptEvent) {
        let _ = self.events_tx.send(CaptionEvent {
            call_id: self.tag.call_id.clone(),
            participant_id: self.tag.participant_id.clone(),
            participant_name: self.participant_name.clone(),
            text: event.text,
            is_final: event.is_final,
            timestamp: event
                .timestamp_ms
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
        });
    }
}
