//! HTTP router and middleware stack

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, Uri, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, warn};

use super::error::ApiError;
use super::health::{health_check, service_info};
use super::rate_limit::{ClientRateLimits, rate_limit_middleware};
use super::tokens::create_token;
use crate::config::Config;
use crate::issuer::CredentialIssuer;

/// Shared application state
pub struct AppState {
    /// Effective configuration
    pub config: Config,
    /// Credential issuer (owns the platform secrets)
    pub issuer: Arc<CredentialIssuer>,
    /// Per-client rate limiters for `/api/*`
    pub rate_limits: Arc<ClientRateLimits>,
    /// Process start, for `uptime`
    pub started_at: Instant,
}

impl AppState {
    /// Build state from config and an issuer.
    #[must_use]
    pub fn new(config: Config, issuer: CredentialIssuer) -> Self {
        let rate_limits = Arc::new(ClientRateLimits::from_config(&config));
        Self {
            config,
            issuer: Arc::new(issuer),
            rate_limits,
            started_at: Instant::now(),
        }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let rate_limits = Arc::clone(&state.rate_limits);
    let cors = cors_layer(&state.config.allowed_origins());
    let max_body_size = state.config.server.max_body_size;
    let x_request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/tokens", post(create_token))
        // Only the /api routes above are rate limited
        .route_layer(middleware::from_fn_with_state(rate_limits, rate_limit_middleware))
        .route("/", get(service_info))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CompressionLayer::new())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state)
}

/// CORS for the configured origins, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// 404 for unmatched routes, including a known path with the wrong method
async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound {
        method,
        path: uri.path().to_string(),
    }
}

/// Turn a handler panic into a 500 JSON error
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Request handler panicked");
    ApiError::Internal(detail.to_string()).into_response()
}
