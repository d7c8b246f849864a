//! Identity normalization.
//!
//! The video platform only accepts user ids made of lowercase ASCII letters,
//! digits, `_` and `-`, at most [`MAX_IDENTITY_LEN`] characters long. Callers
//! hand us arbitrary strings, so every id goes through [`normalize`] before it
//! is signed.
//!
//! # Algorithm
//!
//! 1. Reject the empty string.
//! 2. Lower-case the whole input (full Unicode lower-casing).
//! 3. Replace every character outside `[a-z0-9_-]` with exactly one `_`.
//!    Runs of invalid characters are *not* collapsed.
//! 4. Reject an empty result, or one longer than [`MAX_IDENTITY_LEN`].
//!
//! ```
//! use video_token_core::identity::normalize;
//!
//! let id = normalize("Alice Johnson!").unwrap();
//! assert_eq!(id.as_str(), "alice_johnson_");
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Maximum length of a normalized identity, in characters.
pub const MAX_IDENTITY_LEN: usize = 64;

/// Character substituted for anything outside the allowed set.
pub const REPLACEMENT_CHAR: char = '_';

/// Reasons a raw identifier cannot become a [`NormalizedIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The raw identifier was empty.
    #[error("User ID is required")]
    EmptyIdentifier,

    /// Normalization produced an empty string.
    #[error("Invalid user ID: results in empty string after cleaning")]
    EmptyAfterNormalization,

    /// The normalized identity exceeds [`MAX_IDENTITY_LEN`].
    #[error("User ID too long: maximum {MAX_IDENTITY_LEN} characters allowed (got {len})")]
    IdentifierTooLong {
        /// Length of the normalized result.
        len: usize,
    },
}

/// A user id that satisfies the platform's identity rules.
///
/// Only obtainable through [`normalize`], so holding one is proof the value is
/// non-empty, at most 64 characters and drawn from `[a-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedIdentity(String);

impl NormalizedIdentity {
    /// Borrow the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identity and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns `true` for characters allowed in a normalized identity.
#[must_use]
pub fn is_identity_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

/// Normalize a raw, caller-supplied identifier.
///
/// Pure and deterministic: the same input always yields the same output.
pub fn normalize(raw: &str) -> Result<NormalizedIdentity, NormalizeError> {
    if raw.is_empty() {
        return Err(NormalizeError::EmptyIdentifier);
    }

    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if is_identity_char(c) { c } else { REPLACEMENT_CHAR })
        .collect();

    // Every char is ASCII at this point, so bytes == chars.
    let len = cleaned.len();
    if len == 0 {
        return Err(NormalizeError::EmptyAfterNormalization);
    }
    if len > MAX_IDENTITY_LEN {
        return Err(NormalizeError::IdentifierTooLong { len });
    }

    Ok(NormalizedIdentity(cleaned))
}
