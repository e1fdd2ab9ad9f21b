use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub media: MediaSettings,
    pub transcription: TranscriptionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

/// Access-token verification for incoming requests. Token issuance lives in
/// the platform's auth service; this core only verifies.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
}

/// SFU room provider. `api_url` is the provider's room-management endpoint;
/// `api_key`/`api_secret` sign the per-participant room credentials.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaSettings {
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub credential_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionSettings {
    /// WebSocket endpoint of the streaming transcription service.
    pub endpoint: Option<String>,
    pub language: Option<String>,
    /// Target sample rate sent to the service.
    pub sample_rate: u32,
    /// Milliseconds of PCM per frame pushed to the service.
    pub frame_ms: u32,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("FAIRLINE"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "fairline")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.issuer", "fairline")?
            .set_default("media.api_url", "http://localhost:7880")?
            .set_default("media.api_key", "devkey")?
            .set_default("media.api_secret", "devsecret")?
            .set_default("media.credential_ttl_secs", 14400)?
            .set_default("transcription.endpoint", None::<String>)?
            .set_default("transcription.language", "en")?
            .set_default("transcription.sample_rate", 16000)?
            .set_default("transcription.frame_ms", 20)?
            .build()?;

        config.try_deserialize()
    }
}
