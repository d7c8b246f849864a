//! Video Token Service Library
//!
//! Mints signed access tokens for a real-time video platform.
//!
//! # Flow
//!
//! - **Validate**: the request must carry a non-blank string `userId`
//! - **Normalize**: the id is lower-cased and restricted to `[a-z0-9_-]`, max 64 chars
//! - **Sign**: an injected [`TokenSigner`](issuer::TokenSigner) signs the identity
//!   with the platform secret (HS256 JWT by default)
//! - **Respond**: `{ apiKey, token, userId }`, nothing is stored
//!
//! The platform key and secret are read once at startup and never change.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod issuer;
pub mod secrets;

pub use error::{Error, Result};
pub use video_token_core::{Credential, NormalizeError, NormalizedIdentity, normalize};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "stream-token-service";

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
        Some("text") | None => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
        Some(other) => Err(Error::Config(format!(
            "Unknown log format '{other}' (expected text or json)"
        ))),
    }
}
