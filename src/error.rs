//! Error types for the video token service

use std::io;

use thiserror::Error;

/// Result type alias for the video token service
pub type Result<T> = std::result::Result<T, Error>;

/// Video token service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required secret is not present in the environment
    #[error("Missing required environment variable: {0}")]
    MissingSecret(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
