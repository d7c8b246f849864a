//! Token signing primitive.
//!
//! The issuer treats signing as an opaque capability: `sign(secret, identity)
//! -> token`. [`JwtSigner`] is the production implementation and produces the
//! HS256 JWT the video platform expects for server-side user tokens:
//!
//! ```text
//! header:  {"alg":"HS256","typ":"JWT"}
//! payload: {"user_id":"bob_smith"}            // default
//!          {"user_id":"bob_smith","iat":..,"exp":..}  // with issue_at + token_ttl_secs
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use video_token_core::NormalizedIdentity;

use crate::config::SigningConfig;

/// Signing failures.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// JWT encoding failed.
    #[error("JWT encoding failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The signer refused to sign for another reason.
    #[error("{0}")]
    Rejected(String),
}

/// The signing capability injected into the issuer.
///
/// Implementations must be `Send + Sync` because the issuer is shared across
/// request tasks.
#[async_trait::async_trait]
pub trait TokenSigner: Send + Sync + 'static {
    /// Sign a token for `identity` with the platform `secret`.
    async fn sign(&self, secret: &str, identity: &NormalizedIdentity) -> Result<String, SigningError>;
}

/// Claims carried by platform user tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTokenClaims {
    /// Normalized identity.
    pub user_id: String,
    /// Issued-at (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Expires-at (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// HS256 JWT signer.
#[derive(Debug, Clone, Default)]
pub struct JwtSigner {
    ttl: Option<Duration>,
    issue_at: bool,
}

impl JwtSigner {
    /// Signer producing tokens with neither `iat` nor `exp`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a signer from the `signing` config section.
    #[must_use]
    pub fn from_config(config: &SigningConfig) -> Self {
        Self {
            ttl: config.token_ttl_secs.map(Duration::from_secs),
            issue_at: config.issue_at,
        }
    }

    /// Add an `exp` claim `ttl` after signing time.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Add an `iat` claim.
    #[must_use]
    pub fn with_issued_at(mut self) -> Self {
        self.issue_at = true;
        self
    }

    fn claims_for(&self, identity: &NormalizedIdentity) -> UserTokenClaims {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();

        UserTokenClaims {
            user_id: identity.as_str().to_string(),
            iat: self.issue_at.then_some(now),
            exp: self.ttl.map(|ttl| now + ttl.as_secs()),
        }
    }
}

#[async_trait::async_trait]
impl TokenSigner for JwtSigner {
    async fn sign(&self, secret: &str, identity: &NormalizedIdentity) -> Result<String, SigningError> {
        let claims = self.claims_for(identity);
        let key = EncodingKey::from_secret(secret.as_bytes());
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &key,
        )?)
    }
}
