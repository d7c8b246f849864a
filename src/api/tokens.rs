//! `POST /api/tokens`: issue a platform credential for a user id.
//!
//! ```json
//! // request
//! { "userId": "Bob Smith" }
//! // 200
//! { "apiKey": "<platform key>", "token": "<jwt>", "userId": "bob_smith" }
//! // 400
//! { "message": "userId cannot be empty", "code": "EMPTY_USER_ID" }
//! ```
//!
//! `application/x-www-form-urlencoded` bodies (`userId=Bob+Smith`) are accepted
//! too. Bodies with any other content type are ignored.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use video_token_core::Credential;

use super::error::ApiError;
use super::rate_limit::ClientIp;
use super::router::AppState;
use super::validation::validate_token_request;
use crate::issuer::audit::{self, AuditEvent};

/// How a request body is decoded, chosen by `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Form,
    /// Any other (or no) content type: the body is ignored.
    Ignored,
}

impl BodyFormat {
    fn from_headers(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return Self::Ignored;
        };
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("application/json") {
            Self::Json
        } else if essence.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            Self::Form
        } else {
            Self::Ignored
        }
    }
}

/// Parse the request body into a JSON value.
///
/// Empty bodies and unrecognized content types become `{}`.
fn parse_body(format: BodyFormat, body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    match format {
        BodyFormat::Json => {
            serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
        }
        BodyFormat::Form => parse_form(body),
        BodyFormat::Ignored => Ok(Value::Object(Map::new())),
    }
}

/// Decode `a=1&b=2` into an object of strings. Repeated keys collect into an
/// array.
fn parse_form(body: &[u8]) -> Result<Value, ApiError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|e| ApiError::InvalidForm(e.to_string()))?;

    let mut fields = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match fields.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(key, value);
            }
        }
    }
    Ok(Value::Object(fields))
}

/// Map a failure to buffer the body onto the JSON error shape.
fn body_rejection(rejection: &BytesRejection, limit: usize) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::InvalidBody(rejection.body_text())
    }
}

/// `POST /api/tokens`
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Extension(ClientIp(client_ip)): Extension<ClientIp>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Credential>, ApiError> {
    let body = body
        .map_err(|rejection| body_rejection(&rejection, state.config.server.max_body_size))
        .and_then(|bytes| parse_body(BodyFormat::from_headers(&headers), &bytes))
        .inspect_err(|e| {
            warn!(error = %e, "Unparseable token request body");
            audit::emit(&AuditEvent::denied(e.code(), e.to_string(), client_ip));
        })?;

    let raw = validate_token_request(&body).inspect_err(|e| {
        warn!(code = e.code(), "Token request rejected");
        audit::emit(&AuditEvent::denied(e.code(), e.to_string(), client_ip));
    })?;

    match state.issuer.issue_for(raw).await {
        Ok(credential) => {
            info!(user_id = %credential.identity, "Token generated successfully");
            audit::emit(&AuditEvent::issued(&credential.identity, client_ip));
            Ok(Json(credential))
        }
        Err(e) => {
            error!(error = %e, "Token generation failed");
            audit::emit(&AuditEvent::failed(e.to_string(), client_ip));
            Err(e.into())
        }
    }
}
