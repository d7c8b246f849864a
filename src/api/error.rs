//! HTTP error responses.
//!
//! Every error body has the shape `{ "message", "details"?, "code" }`.

use axum::{
    Json,
    http::{HeaderValue, Method, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::validation::ValidationError;
use crate::issuer::IssuanceError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable summary
    pub message: String,
    /// Underlying cause, when useful to the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Stable machine-readable code
    pub code: &'static str,
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The token request failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Credential issuance failed.
    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    /// The request body is not valid JSON.
    #[error("Request body must be valid JSON")]
    InvalidBody(String),

    /// The request body is not valid form data.
    #[error("Request body must be valid form data")]
    InvalidForm(String),

    /// The request body exceeds `server.max_body_size`.
    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },

    /// The client exceeded its rate limit.
    #[error("Too many requests from this IP, please try again later")]
    RateLimited {
        /// Seconds until the next request is allowed
        retry_after_secs: u64,
    },

    /// No route matched.
    #[error("Route {method} {path} not found")]
    NotFound {
        /// Request method
        method: Method,
        /// Request path
        path: String,
    },

    /// Unexpected failure (e.g. a panicking handler).
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    ///
    /// Issuance failures are reported as `400`, matching the existing API
    /// contract clients rely on.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Issuance(_) | Self::InvalidBody(_) | Self::InvalidForm(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Issuance(_) => "TOKEN_GENERATION_FAILED",
            Self::InvalidBody(_) | Self::InvalidForm(_) => "INVALID_REQUEST_BODY",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::NotFound { .. } => "ROUTE_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Build the JSON body.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let (message, details) = match self {
            Self::Issuance(e) => ("Failed to generate token".to_string(), Some(e.to_string())),
            Self::InvalidBody(cause) | Self::InvalidForm(cause) => {
                (self.to_string(), Some(cause.clone()))
            }
            _ => (self.to_string(), None),
        };
        ErrorBody {
            message,
            details,
            code: self.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
