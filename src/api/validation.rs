//! Request validation gate for `POST /api/tokens`.
//!
//! Checks run in order and the first failure is terminal:
//!
//! 1. `userId` absent (or `null`) → [`ValidationError::MissingIdentifier`]
//! 2. `userId` not a string → [`ValidationError::InvalidIdentifierType`]
//! 3. `userId` blank after trimming → [`ValidationError::EmptyIdentifier`]
//!
//! On success the **untrimmed** string is returned for normalization.

use serde_json::Value;

/// Name of the identity field in the request body.
pub const USER_ID_FIELD: &str = "userId";

/// Client-caused request rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The identity field is absent.
    #[error("userId is required in request body")]
    MissingIdentifier,

    /// The identity field is not a string.
    #[error("userId must be a string")]
    InvalidIdentifierType,

    /// The identity field is blank.
    #[error("userId cannot be empty")]
    EmptyIdentifier,
}

impl ValidationError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingIdentifier => "MISSING_USER_ID",
            Self::InvalidIdentifierType => "INVALID_USER_ID_TYPE",
            Self::EmptyIdentifier => "EMPTY_USER_ID",
        }
    }
}

/// Validate a parsed token request body and return the raw identifier.
pub fn validate_token_request(body: &Value) -> Result<&str, ValidationError> {
    let user_id = match body.get(USER_ID_FIELD) {
        None | Some(Value::Null) => return Err(ValidationError::MissingIdentifier),
        Some(value) => value,
    };

    let Some(raw) = user_id.as_str() else {
        return Err(ValidationError::InvalidIdentifierType);
    };

    if raw.trim().is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }

    Ok(raw)
}
