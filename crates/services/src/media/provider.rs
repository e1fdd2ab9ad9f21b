use async_trait::async_trait;
use fairline_config::MediaSettings;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::transport::{MediaTransport, RoomCredential, RoomInfo, TransportError};

/// HTTP client for the SFU room provider. Room management goes over the
/// provider's REST API; access credentials are HS256 tokens signed with the
/// provider API secret, with the domain user id as the subject identity.
pub struct ProviderTransport {
    http: reqwest::Client,
    settings: MediaSettings,
}

#[derive(Debug, Serialize)]
struct CreateRoomRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    name: String,
}

#[derive(Debug, Serialize)]
struct CredentialClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    name: &'a str,
    room: &'a str,
    exp: u64,
}

impl ProviderTransport {
    pub fn new(settings: MediaSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn rooms_url(&self, suffix: &str) -> String {
        format!("{}/rooms{}", self.settings.api_url.trim_end_matches('/'), suffix)
    }
}

#[async_trait]
impl MediaTransport for ProviderTransport {
    async fn create_room(&self) -> Result<RoomInfo, TransportError> {
        let room_name = generate_room_name();
        let response = self
            .http
            .post(self.rooms_url(""))
            .bearer_auth(&self.settings.api_key)
            .json(&CreateRoomRequest { name: &room_name })
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Provider(format!("{status}: {body}")));
        }

        let created: CreateRoomResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Provider(e.to_string()))?;
        debug!(room = %created.name, "Media room created");

        Ok(RoomInfo {
            room_name: created.name,
        })
    }

    async fn mint_credential(
        &self,
        room_name: &str,
        identity: &str,
        display_name: &str,
    ) -> Result<RoomCredential, TransportError> {
        let exp = chrono::Utc::now().timestamp() as u64 + self.settings.credential_ttl_secs;
        let claims = CredentialClaims {
            iss: &self.settings.api_key,
            sub: identity,
            name: display_name,
            room: room_name,
            exp,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.api_secret.as_bytes()),
        )
        .map_err(|e| TransportError::Provider(e.to_string()))?;

        Ok(RoomCredential {
            room_name: room_name.to_string(),
            identity: identity.to_string(),
            token,
        })
    }

    async fn remove_participant(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<(), TransportError> {
        let response = self
            .http
            .delete(self.rooms_url(&format!("/{room_name}/participants/{identity}")))
            .bearer_auth(&self.settings.api_key)
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        // 404 means the participant already disconnected on their own.
        if !response.status().is_success() && response.status().as_u16() != 404 {
            warn!(room = %room_name, %identity, status = %response.status(), "remove_participant failed");
            return Err(TransportError::Provider(response.status().to_string()));
        }
        Ok(())
    }

    async fn remove_room(&self, room_name: &str) -> Result<(), TransportError> {
        let response = self
            .http
            .delete(self.rooms_url(&format!("/{room_name}")))
            .bearer_auth(&self.settings.api_key)
            .send()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(TransportError::Provider(response.status().to_string()));
        }
        Ok(())
    }
}

fn generate_room_name() -> String {
    let mut rng = rand::rng();
    let parts: Vec<String> = (0..3)
        .map(|_| {
            let n: u32 = rng.random_range(100..999);
            n.to_string()
        })
        .collect();
    format!("fair-{}", parts.join("-"))
}
