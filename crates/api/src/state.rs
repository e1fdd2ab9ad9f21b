use async_trait::async_trait;
use bson::oid::ObjectId;
use dashmap::DashMap;
use fairline_captions::{
    AudioSink, CaptionEngine, StreamTag, Transcriber, TranscriberError, TranscriptStream,
    WsTranscriber,
};
use fairline_config::Settings;
use fairline_services::{
    CallOrchestrator, ChannelEvent, QueueManager,
    channel::ChannelPublisher,
    dao::{BoothDao, CallDao, QueueDao, UserDao},
    media::{MediaTransport, ProviderTransport},
};
use mongodb::Database;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AuthService;
use crate::ws::dispatcher::WsChannel;
use crate::ws::storage::WsStorage;

/// A connection's live caption capture: which call it belongs to and where
/// its binary audio frames go.
pub struct ActiveCapture {
    pub call_id: String,
    pub sink: AudioSink,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub booths: Arc<BoothDao>,
    pub queue: Arc<QueueManager>,
    pub orchestrator: Arc<CallOrchestrator>,
    pub captions: Arc<CaptionEngine>,
    pub ws_storage: Arc<WsStorage>,
    /// Keyed by WS connection id.
    pub captures: Arc<DashMap<String, ActiveCapture>>,
}

/// Stand-in used when no transcription endpoint is configured; every enable
/// attempt tells the client to fall back to local recognition.
struct UnconfiguredTranscriber;

#[async_trait]
impl Transcriber for UnconfiguredTranscriber {
    async fn open_stream(&self, _tag: StreamTag) -> Result<TranscriptStream, TranscriberError> {
        Err(TranscriberError::Misconfigured(
            "transcription endpoint not configured".to_string(),
        ))
    }
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let transport: Arc<dyn MediaTransport> =
            Arc::new(ProviderTransport::new(settings.media.clone()));
        let transcriber: Arc<dyn Transcriber> = match &settings.transcription.endpoint {
            Some(endpoint) => Arc::new(WsTranscriber::new(
                endpoint.clone(),
                settings.transcription.language.clone(),
                settings.transcription.sample_rate,
            )),
            None => {
                warn!("No transcription endpoint configured; captions will fall back client-side");
                Arc::new(UnconfiguredTranscriber)
            }
        };
        Self::with_components(db, settings, transport, transcriber)
    }

    /// Wiring seam: tests pass fake transport/transcriber implementations.
    pub fn with_components(
        db: Database,
        settings: Settings,
        transport: Arc<dyn MediaTransport>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let booths = Arc::new(BoothDao::new(&db));
        let calls = Arc::new(CallDao::new(&db));
        let queue_dao = Arc::new(QueueDao::new(&db));

        let ws_storage = Arc::new(WsStorage::new());
        let channel: Arc<dyn ChannelPublisher> = Arc::new(WsChannel::new(ws_storage.clone()));

        let queue = Arc::new(QueueManager::new(
            queue_dao,
            booths.clone(),
            channel.clone(),
        ));
        let captions = CaptionEngine::new(transcriber);
        let orchestrator = Arc::new(CallOrchestrator::new(
            calls,
            users.clone(),
            booths.clone(),
            queue.clone(),
            transport,
            channel.clone(),
            captions.clone(),
        ));

        let state = Self {
            db,
            settings,
            auth,
            users,
            booths,
            queue,
            orchestrator,
            captions: captions.clone(),
            ws_storage,
            captures: Arc::new(DashMap::new()),
        };
        state.spawn_caption_relay(channel);
        state
    }

    /// Bridges caption events from the engine onto each call's channel room.
    fn spawn_caption_relay(&self, channel: Arc<dyn ChannelPublisher>) {
        let mut events = self.captions.subscribe();
        tokio::spawn(async move {
            info!("Caption relay started");
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Caption relay lagged");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let Ok(call_id) = ObjectId::parse_str(&event.call_id) else {
                    continue;
                };
                channel
                    .publish(
                        &fairline_services::channel::call_room(call_id),
                        &ChannelEvent::CaptionTranscription {
                            call_id: event.call_id,
                            participant_id: event.participant_id,
                            participant_name: event.participant_name,
                            text: event.text,
                            is_final: event.is_final,
                            timestamp: event.timestamp,
                        },
                    )
                    .await;
            }
            info!("Caption relay stopped");
        });
    }
}
