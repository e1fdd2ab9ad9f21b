use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use fairline_config::JwtSettings;
use fairline_db::models::{User, UserRole};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, hex.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub iss: String,
    pub exp: i64,
}

/// Verifies platform access tokens. Account issuance lives in the identity
/// service; we only need `issue_access_token` for local tooling and tests.
pub struct AuthService {
    settings: JwtSettings,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl AuthService {
    pub fn new(settings: JwtSettings) -> Self {
        let encoding = EncodingKey::from_secret(settings.secret.as_bytes());
        let decoding = DecodingKey::from_secret(settings.secret.as_bytes());
        Self {
            settings,
            encoding,
            decoding,
        }
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, AuthError> {
        let user_id = user.id.unwrap_or_else(ObjectId::new);
        let claims = Claims {
            sub: user_id.to_hex(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            role: match user.role {
                UserRole::JobSeeker => "job_seeker".to_string(),
                UserRole::Recruiter => "recruiter".to_string(),
                UserRole::Interpreter => "interpreter".to_string(),
            },
            iss: self.settings.issuer.clone(),
            exp: (Utc::now() + Duration::hours(12)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.settings.issuer]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}
