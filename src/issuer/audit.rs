//! Audit logging for credential issuance.
//!
//! Every event is emitted via `tracing` with the event serialized as JSON in
//! the `audit` field. Events carry the normalized identity at most; raw
//! caller input, tokens and secrets are never recorded.
//!
//! # Events
//!
//! | Event | When |
//! |-------|------|
//! | `token.issued` | A credential was signed and returned |
//! | `token.denied` | The request failed validation |
//! | `token.failed` | Normalization, signing or the signing timeout failed |

use std::net::IpAddr;

use serde::Serialize;
use video_token_core::NormalizedIdentity;

/// Structured audit event.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event type string (e.g., `"token.issued"`).
    pub event: &'static str,
    /// Normalized identity, when one was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Machine-readable error code for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Client IP address (when available).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
    /// Human-readable reason for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    /// Construct a `token.issued` event.
    #[must_use]
    pub fn issued(identity: &NormalizedIdentity, client_ip: Option<IpAddr>) -> Self {
        Self {
            event: "token.issued",
            user_id: Some(identity.as_str().to_string()),
            code: None,
            client_ip,
            reason: None,
        }
    }

    /// Construct a `token.denied` event for a rejected request.
    #[must_use]
    pub fn denied(code: &'static str, reason: impl Into<String>, client_ip: Option<IpAddr>) -> Self {
        Self {
            event: "token.denied",
            user_id: None,
            code: Some(code),
            client_ip,
            reason: Some(reason.into()),
        }
    }

    /// Construct a `token.failed` event.
    #[must_use]
    pub fn failed(reason: impl Into<String>, client_ip: Option<IpAddr>) -> Self {
        Self {
            event: "token.failed",
            user_id: None,
            code: Some("TOKEN_GENERATION_FAILED"),
            client_ip,
            reason: Some(reason.into()),
        }
    }
}

/// Emit an audit event.
///
/// `token.issued` goes out at `INFO`, everything else at `WARN`:
///
/// ```text
/// INFO video_token_service::issuer::audit audit={"event":"token.issued","user_id":"bob_smith"}
/// ```
pub fn emit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(ref json) if event.event == "token.issued" => {
            tracing::info!(audit = %json, "token audit");
        }
        Ok(ref json) => tracing::warn!(audit = %json, "token audit"),
        Err(ref e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
    }
}
