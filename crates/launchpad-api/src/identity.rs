//! Identity-provider ("Civic") login.
//!
//! The provider hands the client a signed assertion; we only check the
//! signature and claims and read the subject and profile out of it. How the
//! provider verified the person is its own business.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;

/// Subject and profile claims asserted by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, assertion: &str) -> Result<ExternalIdentity, ApiError>;
}

#[derive(Debug, Deserialize)]
struct AssertionClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Verifies HS256 assertions signed with a secret shared with the provider.
pub struct CivicVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl CivicVerifier {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl IdentityVerifier for CivicVerifier {
    fn verify(&self, assertion: &str) -> Result<ExternalIdentity, ApiError> {
        let data = decode::<AssertionClaims>(assertion, &self.key, &self.validation).map_err(|e| {
            debug!("Rejected identity assertion: {}", e);
            ApiError::InvalidToken
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(ApiError::InvalidToken);
        }

        Ok(ExternalIdentity {
            subject: claims.sub,
            email: claims.email.filter(|e| !e.trim().is_empty()),
            name: claims.name.filter(|n| !n.trim().is_empty()),
        })
    }
}
