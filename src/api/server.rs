//! Token service server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::router::{AppState, create_router};
use crate::config::Config;
use crate::issuer::CredentialIssuer;
use crate::secrets::ServiceSecrets;
use crate::{Error, Result};

/// How often idle rate limiter state is pruned.
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Video token HTTP server
pub struct TokenService {
    state: Arc<AppState>,
}

impl TokenService {
    /// Create the service with the production JWT issuer.
    #[must_use]
    pub fn new(config: Config, secrets: ServiceSecrets) -> Self {
        let issuer = CredentialIssuer::from_config(secrets, &config.signing);
        Self::with_issuer(config, issuer)
    }

    /// Create the service around a prepared issuer.
    #[must_use]
    pub fn with_issuer(config: Config, issuer: CredentialIssuer) -> Self {
        Self {
            state: Arc::new(AppState::new(config, issuer)),
        }
    }

    /// Run until SIGINT/SIGTERM, then drain in-flight requests.
    pub async fn run(self) -> Result<()> {
        let config = &self.state.config;
        let addr = SocketAddr::new(
            config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            config.server.port,
        );
        let shutdown_timeout = config.server.shutdown_timeout;

        let (shutdown_tx, _) = broadcast::channel(1);

        let app = create_router(Arc::clone(&self.state));
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("VIDEO TOKEN SERVICE v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %config.server.host, port = config.server.port, "Listening");
        info!(environment = %config.environment, "Environment");
        info!("  Health check: http://{addr}/api/health");
        info!("  Token endpoint: http://{addr}/api/tokens");
        if self.state.rate_limits.is_enabled() {
            info!(
                max_requests = config.max_requests_per_window(),
                window = ?config.rate_limit.window,
                "RATE LIMITING enabled"
            );
        } else {
            warn!("RATE LIMITING disabled");
        }
        info!("============================================================");

        // Prune idle rate limiter entries
        let rate_limits = Arc::clone(&self.state.rate_limits);
        let mut prune_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => rate_limits.retain_recent(),
                    _ = prune_shutdown.recv() => break,
                }
            }
        });

        let mut serve_shutdown = shutdown_tx.subscribe();
        let mut server = tokio::spawn(
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = serve_shutdown.recv().await;
            })
            .into_future(),
        );

        tokio::select! {
            result = &mut server => {
                return result.map_err(|e| Error::Internal(e.to_string()))?.map_err(Error::Io);
            }
            () = shutdown_signal() => {}
        }

        let _ = shutdown_tx.send(());
        match tokio::time::timeout(shutdown_timeout, server).await {
            Ok(result) => result.map_err(|e| Error::Internal(e.to_string()))?.map_err(Error::Io),
            Err(_) => {
                warn!(timeout = ?shutdown_timeout, "In-flight requests did not drain before timeout");
                Ok(())
            }
        }
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, shutting down gracefully...");
}
