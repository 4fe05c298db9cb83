//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order (metrics, health, info)
//! - Build the routers, bind listeners, then mark the process ready
//! - Start background tasks (metrics upkeep, signal watcher)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Configuration is validated before this module runs, so an invalid
//!   environment never binds a port
//! - Readiness is withdrawn as soon as shutdown begins

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::health::{ApplicationCheck, HealthRegistry, Readiness};
use crate::http::{AppState, HttpServer};
use crate::info::InstanceInfo;
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::Shutdown;
use crate::observability::{Metrics, Structured};

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Error type for startup and serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build metrics registry: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

impl StartupError {
    /// Category used as the `error.kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            StartupError::Metrics(_) => "metrics",
            StartupError::Bind { .. } => "bind",
            StartupError::Serve(_) => "serve",
        }
    }
}

/// Build the shared state and the readiness flag it reports through.
pub fn build_state(config: Config) -> Result<(AppState, Readiness), StartupError> {
    let metrics = Metrics::new()?;
    metrics.set_app_info(&config.version, config.environment.as_str());

    let readiness = Readiness::new();
    let health = HealthRegistry::new(Duration::from_millis(config.health.check_timeout_ms))
        .with_check(ApplicationCheck::new(readiness.clone()));
    let info = InstanceInfo::capture(&config);

    let state = AppState {
        config: Arc::new(config),
        metrics,
        health: Arc::new(health),
        info: Arc::new(info),
    };
    Ok((state, readiness))
}

/// Bind a listener on `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, StartupError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| StartupError::Bind {
            address: format!("{}:{}", host, port),
            source,
        })
}

/// Periodically drain histogram samples until shutdown.
pub fn spawn_metrics_upkeep(metrics: Metrics, shutdown: &Shutdown) -> JoinHandle<()> {
    let stop = shutdown.signalled();
    tokio::spawn(async move {
        let mut ticker = time::interval(METRICS_UPKEEP_INTERVAL);
        tokio::pin!(stop);
        loop {
            tokio::select! {
                _ = ticker.tick() => metrics.run_upkeep(),
                _ = &mut stop => break,
            }
        }
    })
}

/// Start the service and serve until SIGINT/SIGTERM.
pub async fn run(config: Config) -> Result<(), StartupError> {
    tracing::info!(
        environment = %config.environment,
        version = %config.version,
        host = %config.server.host,
        port = config.server.port,
        log_level = config.logging.level.as_directive(),
        metrics_enabled = config.metrics.enabled,
        metrics_path = %config.metrics.path,
        metrics_port = ?config.metrics.port,
        workers = config.runtime.workers,
        threads = config.runtime.threads,
        timeout_secs = config.runtime.timeout_secs,
        keepalive_secs = config.runtime.keepalive_secs,
        max_requests = config.runtime.max_requests,
        api_key_set = config.secrets.api_key.is_some(),
        jwt_secret_set = config.secrets.jwt_secret.is_some(),
        "Configuration loaded"
    );

    let (state, readiness) = build_state(config)?;
    let config = state.config.clone();
    let checks: Vec<String> = state
        .health
        .check_names()
        .into_iter()
        .map(String::from)
        .collect();
    let server = HttpServer::new(state.clone());

    let listener = bind(&config.server.host, config.server.port).await?;
    let metrics_listener = match config.metrics_listener_port() {
        Some(port) => Some(bind(&config.server.host, port).await?),
        None => None,
    };

    let shutdown = Shutdown::new();
    let upkeep = spawn_metrics_upkeep(state.metrics.clone(), &shutdown);

    {
        let shutdown = shutdown.clone();
        let readiness = readiness.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_signal() => {}
                _ = shutdown.signalled() => {}
            }
            readiness.mark_not_ready();
            shutdown.trigger();
        });
    }

    readiness.mark_ready();
    tracing::info!(checks = %Structured(&checks), "Service ready");

    server.run(listener, metrics_listener, &shutdown).await?;

    let _ = upkeep.await;
    tracing::info!("Shutdown complete");
    Ok(())
}
