use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use launchpad_types::api::Claims;

use crate::error::ApiError;

/// Issues and checks HS256 session tokens. Tokens carry everything needed
/// to validate them; nothing is stored server-side, so there is no revocation.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, email: &str, now: DateTime<Utc>) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("Token encoding failed: {}", e))?;
        Ok(token)
    }

    /// Valid strictly before `exp`; a token presented at its expiry second
    /// is rejected.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against `now`, with no leeway
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| ApiError::InvalidToken)?;

        if now.timestamp() >= data.claims.exp {
            return Err(ApiError::InvalidToken);
        }

        Ok(data.claims)
    }
}
