//! Credential issuance: normalized identity in, signed platform credential out.
//!
//! 1. **Normalize**: raw ids are sanitized by [`video_token_core::normalize`].
//! 2. **Sign**: the injected [`TokenSigner`] signs the identity with the
//!    platform secret. The call is awaited once, bounded by the signing
//!    timeout, and never retried.
//! 3. **Assemble**: the result is returned as a [`Credential`] and not kept.
//!
//! There is no cache and no session store: every call re-signs.

pub mod audit;
pub mod signer;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use video_token_core::{Credential, NormalizeError, NormalizedIdentity, normalize};

use crate::config::SigningConfig;
use crate::secrets::ServiceSecrets;

pub use audit::AuditEvent;
pub use signer::{JwtSigner, SigningError, TokenSigner, UserTokenClaims};

/// Why a credential could not be issued.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// The identifier could not be normalized.
    #[error(transparent)]
    Identity(#[from] NormalizeError),

    /// The signing primitive failed.
    #[error("Token signing failed: {0}")]
    Signing(#[from] SigningError),

    /// The signing primitive did not answer in time.
    #[error("Token signing timed out after {0:?}")]
    Timeout(Duration),
}

/// Issues credentials for normalized identities.
///
/// Owns the [`ServiceSecrets`] for the process lifetime; shared across request
/// tasks behind an `Arc`.
pub struct CredentialIssuer {
    secrets: ServiceSecrets,
    signer: Arc<dyn TokenSigner>,
    timeout: Option<Duration>,
}

impl CredentialIssuer {
    /// Create an issuer with no signing timeout.
    #[must_use]
    pub fn new(secrets: ServiceSecrets, signer: Arc<dyn TokenSigner>) -> Self {
        Self {
            secrets,
            signer,
            timeout: None,
        }
    }

    /// Create the production issuer: [`JwtSigner`] plus the configured timeout.
    #[must_use]
    pub fn from_config(secrets: ServiceSecrets, config: &SigningConfig) -> Self {
        Self::new(secrets, Arc::new(JwtSigner::from_config(config))).with_timeout(config.timeout)
    }

    /// Abandon signing calls that take longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The public platform key included in every credential.
    #[must_use]
    pub fn platform_key(&self) -> &str {
        self.secrets.platform_key()
    }

    /// Sign a credential for an already-normalized identity.
    pub async fn issue(&self, identity: &NormalizedIdentity) -> Result<Credential, IssuanceError> {
        let signing = self.signer.sign(self.secrets.platform_secret(), identity);

        let signed_token = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, signing)
                .await
                .map_err(|_| IssuanceError::Timeout(limit))??,
            None => signing.await?,
        };

        debug!(user_id = %identity, "Signed platform token");

        Ok(Credential {
            platform_key: self.secrets.platform_key().to_string(),
            signed_token,
            identity: identity.clone(),
        })
    }

    /// Normalize `raw` and issue a credential for the result.
    pub async fn issue_for(&self, raw: &str) -> Result<Credential, IssuanceError> {
        let identity = normalize(raw)?;
        self.issue(&identity).await
    }
}
