use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Why a bearer token failed to resolve to a user. All variants surface
/// as a 401 at the HTTP boundary; the distinction is kept for logging.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    MissingToken,

    #[error("invalid or expired token")]
    Invalid,

    #[error("token subject no longer exists")]
    SubjectNotFound,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        tracing::debug!("Auth rejection: {}", err);
        AppError::Unauthorized
    }
}

/// Identity claims carried inside an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub id: i64,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Issues and verifies signed, time-bounded access tokens. Stateless:
/// verification is pure computation against the signing secret, with no
/// session table behind it.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::minutes(config.ttl_minutes),
        }
    }

    pub fn issue(&self, username: &str, user_id: i64) -> Result<String, AppError> {
        self.issue_with_ttl(username, user_id, self.ttl)
    }

    fn issue_with_ttl(
        &self,
        username: &str,
        user_id: i64,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let expires = Utc::now() + ttl;
        let claims = Claims {
            sub: username.to_string(),
            id: user_id,
            exp: expires.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Decode and check both signature and expiry. Structural garbage,
    /// a bad signature, and an expired token are indistinguishable to
    /// the caller.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::Invalid)
    }
}

/// Generate a random 32-byte hex secret for installs that have not
/// configured one.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
