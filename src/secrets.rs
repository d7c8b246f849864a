//! Platform credentials loaded from the environment.
//!
//! The platform API key and secret are read once at startup and moved into the
//! [`CredentialIssuer`](crate::issuer::CredentialIssuer). Nothing mutates them
//! afterwards. The secret never leaves the process: it is redacted from
//! `Debug`, never serialized and never logged.

use std::fmt;

use crate::{Error, Result};

/// Environment variable holding the public platform API key.
pub const API_KEY_VAR: &str = "STREAM_API_KEY";

/// Environment variable holding the platform API secret.
pub const API_SECRET_VAR: &str = "STREAM_API_SECRET";

/// Process-wide platform credentials.
#[derive(Clone)]
pub struct ServiceSecrets {
    platform_key: String,
    platform_secret: String,
}

impl ServiceSecrets {
    /// Build secrets from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if either value is empty.
    pub fn new(platform_key: impl Into<String>, platform_secret: impl Into<String>) -> Result<Self> {
        let platform_key = platform_key.into();
        let platform_secret = platform_secret.into();
        if platform_key.is_empty() {
            return Err(Error::MissingSecret(API_KEY_VAR.to_string()));
        }
        if platform_secret.is_empty() {
            return Err(Error::MissingSecret(API_SECRET_VAR.to_string()));
        }
        Ok(Self {
            platform_key,
            platform_secret,
        })
    }

    /// Read `STREAM_API_KEY` and `STREAM_API_SECRET` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] naming the first variable that is unset
    /// or empty. The process must not start without both.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read both secrets through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::MissingSecret(name.to_string()))
        };
        Ok(Self {
            platform_key: read(API_KEY_VAR)?,
            platform_secret: read(API_SECRET_VAR)?,
        })
    }

    /// The public platform API key. Safe to return to clients.
    #[must_use]
    pub fn platform_key(&self) -> &str {
        &self.platform_key
    }

    /// The platform secret, for the signer only.
    #[must_use]
    pub(crate) fn platform_secret(&self) -> &str {
        &self.platform_secret
    }
}

impl fmt::Debug for ServiceSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSecrets")
            .field("platform_key", &self.platform_key)
            .field("platform_secret", &"[REDACTED]")
            .finish()
    }
}
