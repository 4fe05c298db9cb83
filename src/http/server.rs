//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request tracking, timeout)
//! - Serve the API listener and, when configured, a dedicated metrics listener
//! - Stop both on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::config::Config;
use crate::health::HealthRegistry;
use crate::http::handlers;
use crate::http::middleware::track_request;
use crate::http::response::TIMEOUT_STATUS;
use crate::http::routes;
use crate::info::InstanceInfo;
use crate::lifecycle::Shutdown;
use crate::observability::Metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metrics: Metrics,
    pub health: Arc<HealthRegistry>,
    pub info: Arc<InstanceInfo>,
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    metrics_router: Option<Router>,
}

impl HttpServer {
    /// Create a new HTTP server from shared state.
    pub fn new(state: AppState) -> Self {
        let metrics_router = state
            .config
            .metrics_listener_port()
            .map(|_| Self::build_metrics_router(state.clone()));
        let router = Self::build_router(state);
        Self {
            router,
            metrics_router,
        }
    }

    /// The API router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The dedicated metrics router, when `METRICS_PORT` differs from `PORT`.
    pub fn metrics_router(&self) -> Option<Router> {
        self.metrics_router.clone()
    }

    fn build_router(state: AppState) -> Router {
        let mut router: Router<AppState> = Router::new()
            .route(routes::HEALTHZ, get(handlers::healthz))
            .route(routes::LIVEZ, get(handlers::livez))
            .route(routes::INFO, get(handlers::info));

        if state.config.serves_metrics_inline() {
            router = router.route(&state.config.metrics.path, get(handlers::metrics));
        }

        Self::with_request_layers(router.fallback(handlers::not_found), state)
    }

    fn build_metrics_router(state: AppState) -> Router {
        let router: Router<AppState> = Router::new()
            .route(&state.config.metrics.path, get(handlers::metrics))
            .fallback(handlers::not_found);
        Self::with_request_layers(router, state)
    }

    /// Tracking wraps the timeout so timed-out requests are still recorded.
    fn with_request_layers(router: Router<AppState>, state: AppState) -> Router {
        let timeout = Duration::from_secs(state.config.runtime.timeout_secs);
        router
            .layer(TimeoutLayer::with_status_code(TIMEOUT_STATUS, timeout))
            .layer(middleware::from_fn_with_state(state.clone(), track_request))
            .with_state(state)
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(
        self,
        listener: TcpListener,
        metrics_listener: Option<TcpListener>,
        shutdown: &Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let metrics_task = match (self.metrics_router, metrics_listener) {
            (Some(router), Some(metrics_listener)) => {
                tracing::info!(
                    address = %metrics_listener.local_addr()?,
                    "Metrics server starting"
                );
                let stop = shutdown.signalled();
                Some(tokio::spawn(async move {
                    axum::serve(metrics_listener, router)
                        .with_graceful_shutdown(stop)
                        .await
                }))
            }
            (Some(_), None) => {
                tracing::warn!("No metrics listener provided; metrics will not be served");
                None
            }
            (None, Some(_)) => {
                tracing::warn!("Metrics listener provided but metrics are served inline; ignoring it");
                None
            }
            (None, None) => None,
        };

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.signalled())
            .await;
        if !shutdown.is_triggered() {
            tracing::warn!("API listener stopped before shutdown was requested");
        }
        // Stop the metrics listener too if the API listener failed.
        shutdown.trigger();

        if let Some(task) = metrics_task {
            match task.await {
                Ok(result) => result?,
                Err(e) => {
                    let kind = if e.is_panic() { "panic" } else { "cancelled" };
                    tracing::error!(
                        error.kind = kind,
                        error.message = %e,
                        "Metrics server task failed"
                    );
                }
            }
        }
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
