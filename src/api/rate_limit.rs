//! Per-client rate limiting for `/api/*`.
//!
//! Clients are keyed by the socket peer address. Proxy headers
//! (`X-Forwarded-For` first hop, then `X-Real-IP`) are only consulted when
//! `rate_limit.trust_proxy_headers` is set, since any client can forge them.
//! Requests with no discoverable address share one bucket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use tracing::{debug, warn};

use super::error::ApiError;
use crate::config::Config;

/// Bucket for requests whose client address is unknown.
const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Client address attached to each `/api/*` request by [`rate_limit_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

/// Rate limiters keyed by client IP.
pub struct ClientRateLimits {
    limiter: Option<DefaultKeyedRateLimiter<IpAddr>>,
    clock: DefaultClock,
    trust_proxy_headers: bool,
}

/// Quota for `max_requests` per `window`: a full burst of `max_requests`,
/// then one request back every `window / max_requests`.
///
/// Returns `None` when rate limiting is disabled or the window is too small
/// to divide.
#[must_use]
pub fn client_quota(config: &Config) -> Option<Quota> {
    if !config.rate_limit.enabled {
        return None;
    }
    let max = NonZeroU32::new(config.max_requests_per_window()).unwrap_or(NonZeroU32::MIN);
    let period = config.rate_limit.window / max.get();
    Quota::with_period(period).map(|quota| quota.allow_burst(max))
}

impl ClientRateLimits {
    /// Build limiters from config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        if !config.rate_limit.enabled {
            return Self::disabled();
        }
        let limiter = client_quota(config).map(RateLimiter::keyed);
        if limiter.is_none() {
            warn!(window = ?config.rate_limit.window, "Rate limit window too small, rate limiting disabled");
        }
        Self {
            limiter,
            clock: DefaultClock::default(),
            trust_proxy_headers: config.rate_limit.trust_proxy_headers,
        }
    }

    /// Limiter that allows everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            limiter: None,
            clock: DefaultClock::default(),
            trust_proxy_headers: false,
        }
    }

    /// Whether requests are being limited.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Address used to key `headers`/`peer`: the peer, or the proxy headers
    /// when they are trusted.
    #[must_use]
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
        if self.trust_proxy_headers {
            client_ip(headers, peer)
        } else {
            peer
        }
    }

    /// Record a request from `client`. Returns `Err(wait)` when over the limit.
    pub fn check(&self, client: Option<IpAddr>) -> Result<(), Duration> {
        let Some(ref limiter) = self.limiter else {
            return Ok(());
        };
        let key = client.unwrap_or(UNKNOWN_CLIENT);
        limiter
            .check_key(&key)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Drop state for clients whose buckets have fully refilled.
    pub fn retain_recent(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.retain_recent();
            debug!(clients = limiter.len(), "Pruned rate limiter state");
        }
    }
}

/// Extract client IP from `X-Forwarded-For` or `X-Real-IP` headers, falling
/// back to the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
        })
        .or(peer)
}

/// Rate limiting middleware. Also records the [`ClientIp`] for handlers.
pub async fn rate_limit_middleware(
    State(limits): State<Arc<ClientRateLimits>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = limits.client_key(request.headers(), peer);
    request.extensions_mut().insert(ClientIp(ip));

    if let Err(wait) = limits.check(ip) {
        warn!(client_ip = ?ip, path = %request.uri().path(), "Rate limit exceeded");
        let retry_after_secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
        return ApiError::RateLimited {
            retry_after_secs: retry_after_secs.max(1),
        }
        .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::config::RateLimitConfig;

    fn config(max: u32, trust_proxy_headers: bool) -> Config {
        Config {
            rate_limit: RateLimitConfig {
                enabled: true,
                window: Duration::from_secs(60),
                max_requests: Some(max),
                trust_proxy_headers,
            },
            ..Config::default()
        }
    }

    fn limits(max: u32) -> ClientRateLimits {
        ClientRateLimits::from_config(&config(max, false))
    }

    #[test]
    fn quota_allows_full_burst_then_refills_evenly() {
        // GIVEN: 100 requests per 15 minutes
        let config = Config {
            rate_limit: RateLimitConfig {
                max_requests: Some(100),
                ..RateLimitConfig::default()
            },
            ..Config::default()
        };

        // WHEN
        let quota = client_quota(&config).unwrap();

        // THEN: 100 up front, then one back every 9s (900s / 100)
        assert_eq!(quota.burst_size().get(), 100);
        assert_eq!(quota.replenish_interval(), Duration::from_secs(9));
    }

    #[test]
    fn quota_is_none_when_disabled() {
        let config = Config {
            rate_limit: RateLimitConfig {
                enabled: false,
                ..RateLimitConfig::default()
            },
            ..Config::default()
        };
        assert!(client_quota(&config).is_none());
    }

    #[test]
    fn proxy_headers_are_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        let peer: IpAddr = "127.0.0.1".parse().unwrap();

        let untrusted = ClientRateLimits::from_config(&config(10, false));
        assert_eq!(untrusted.client_key(&headers, Some(peer)), Some(peer));
        assert_eq!(untrusted.client_key(&headers, None), None);

        let trusted = ClientRateLimits::from_config(&config(10, true));
        assert_eq!(
            trusted.client_key(&headers, Some(peer)),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn allows_up_to_max_then_rejects() {
        let limits = limits(2);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limits.check(Some(ip)).is_ok());
        assert!(limits.check(Some(ip)).is_ok());
        let wait = limits.check(Some(ip)).unwrap_err();
        assert!(wait <= Duration::from_secs(30));
    }

    #[test]
    fn clients_are_limited_independently() {
        let limits = limits(1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limits.check(Some(a)).is_ok());
        assert!(limits.check(Some(a)).is_err());
        assert!(limits.check(Some(b)).is_ok());
    }

    #[test]
    fn unknown_clients_share_a_bucket() {
        let limits = limits(1);
        assert!(limits.check(None).is_ok());
        assert!(limits.check(None).is_err());
    }

    #[test]
    fn disabled_allows_everything() {
        let config = Config {
            rate_limit: RateLimitConfig {
                enabled: false,
                ..RateLimitConfig::default()
            },
            ..Config::default()
        };
        let limits = ClientRateLimits::from_config(&config);
        assert!(!limits.is_enabled());
        for _ in 0..100 {
            assert!(limits.check(None).is_ok());
        }
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        let peer: IpAddr = "127.0.0.1".parse().unwrap();

        assert_eq!(
            client_ip(&headers, Some(peer)),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_ip(&headers, None), Some("198.51.100.1".parse().unwrap()));

        let peer: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), Some(peer));
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }
}
