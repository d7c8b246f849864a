//! Video token service core library: identity normalization and credential types.
//!
//! Kept free of any HTTP or async dependencies so the rules can be reused by
//! other front-ends (CLI, tests, benchmarks).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credential;
pub mod identity;

pub use credential::Credential;
pub use identity::{MAX_IDENTITY_LEN, NormalizeError, NormalizedIdentity, normalize};
