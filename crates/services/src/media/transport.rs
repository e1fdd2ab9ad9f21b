use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("media transport unavailable: {0}")]
    Unavailable(String),
    #[error("media provider rejected the request: {0}")]
    Provider(String),
}

#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_name: String,
}

/// A per-participant room access credential. The identity is the domain user
/// id verbatim, which is what makes roster reconciliation an exact lookup.
#[derive(Debug, Clone, Serialize)]
pub struct RoomCredential {
    pub room_name: String,
    pub identity: String,
    pub token: String,
}

/// The SFU room provider, as seen by the orchestrator. Rooms are owned by
/// exactly one call for their lifetime; only the orchestrator creates or
/// destroys them.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn create_room(&self) -> Result<RoomInfo, TransportError>;

    async fn mint_credential(
        &self,
        room_name: &str,
        identity: &str,
        display_name: &str,
    ) -> Result<RoomCredential, TransportError>;

    /// Drops one participant's publications without touching the room.
    async fn remove_participant(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<(), TransportError>;

    async fn remove_room(&self, room_name: &str) -> Result<(), TransportError>;
}
