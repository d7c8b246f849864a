//! Health and service-info endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use super::router::AppState;
use crate::SERVICE_NAME;

/// Display name reported by `GET /`.
pub const SERVICE_DISPLAY_NAME: &str = "Stream Token Service";

/// `GET /api/health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process can answer
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Current time, ISO-8601 UTC
    pub timestamp: String,
    /// Whole seconds since the service started
    pub uptime: u64,
}

/// `GET /api/health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.started_at.elapsed().as_secs(),
    })
}

/// Endpoint paths advertised by `GET /`.
#[derive(Debug, Serialize)]
pub struct Endpoints {
    /// Health check path
    pub health: &'static str,
    /// Token issuance path
    pub tokens: &'static str,
}

/// `GET /` response.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    /// Display name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Always `"running"`
    pub status: &'static str,
    /// Available endpoints
    pub endpoints: Endpoints,
}

/// `GET /`
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_DISPLAY_NAME,
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: Endpoints {
            health: "/api/health",
            tokens: "/api/tokens",
        },
    })
}
