//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;

use vitals::config::{self, Config, LogFormat};
use vitals::health::{ApplicationCheck, HealthCheck, HealthCheckFailure, HealthRegistry, Readiness};
use vitals::http::{AppState, HttpServer};
use vitals::info::InstanceInfo;
use vitals::lifecycle::Shutdown;
use vitals::observability::logging::RecordLayer;
use vitals::observability::metrics::find_sample;
use vitals::observability::Metrics;

/// Config from an explicit environment map.
pub fn config_with(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    config::load_from(&vars).expect("valid test config")
}

/// Builder for application state with custom checks and hostname.
pub struct TestApp {
    pub config: Config,
    pub hostname: Option<String>,
    pub checks: Vec<Box<dyn FnOnce(HealthRegistry) -> HealthRegistry>>,
    pub ready: bool,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            config: config_with(&[]),
            hostname: Some("test-host".to_string()),
            checks: Vec::new(),
            ready: true,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn hostname(mut self, hostname: Option<&str>) -> Self {
        self.hostname = hostname.map(String::from);
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn check(mut self, check: impl HealthCheck + 'static) -> Self {
        self.checks
            .push(Box::new(move |registry: HealthRegistry| registry.with_check(check)));
        self
    }

    pub fn state(self) -> (AppState, Readiness) {
        let metrics = Metrics::new().unwrap();
        metrics.set_app_info(&self.config.version, self.config.environment.as_str());

        let readiness = Readiness::new();
        if self.ready {
            readiness.mark_ready();
        }
        let mut health = HealthRegistry::new(Duration::from_millis(
            self.config.health.check_timeout_ms,
        ))
        .with_check(ApplicationCheck::new(readiness.clone()));
        for add in self.checks {
            health = add(health);
        }

        let info = InstanceInfo::new(self.hostname, &self.config);
        let state = AppState {
            config: Arc::new(self.config),
            metrics,
            health: Arc::new(health),
            info: Arc::new(info),
        };
        (state, readiness)
    }

    pub fn build(self) -> (HttpServer, AppState) {
        let (state, _) = self.state();
        (HttpServer::new(state.clone()), state)
    }
}

/// A sub-check that always fails with `reason`.
pub struct FailingCheck {
    pub name: &'static str,
    pub reason: &'static str,
}

#[async_trait]
impl HealthCheck for FailingCheck {
    fn name(&self) -> &str {
        self.name
    }

    async fn check(&self) -> Result<(), HealthCheckFailure> {
        Err(HealthCheckFailure::Failed(self.reason.to_string()))
    }
}

/// A sub-check that never completes on its own.
pub struct HangingCheck {
    pub name: &'static str,
    pub timeout: Duration,
}

#[async_trait]
impl HealthCheck for HangingCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn check(&self) -> Result<(), HealthCheckFailure> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// A sub-check that panics, driving the handler into the unhandled-failure path.
pub struct PanickingCheck;

#[async_trait]
impl HealthCheck for PanickingCheck {
    fn name(&self) -> &str {
        "exploding"
    }

    async fn check(&self) -> Result<(), HealthCheckFailure> {
        panic!("sub-check exploded");
    }
}

/// A sub-check that takes `delay` before succeeding.
pub struct SlowCheck {
    pub delay: Duration,
}

#[async_trait]
impl HealthCheck for SlowCheck {
    fn name(&self) -> &str {
        "slow"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.delay * 10)
    }

    async fn check(&self) -> Result<(), HealthCheckFailure> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Current value of one series in the state's registry.
pub fn metric(state: &AppState, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    find_sample(&state.metrics.snapshot(), name, labels)
}

/// Log output collected in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    /// Route this thread's JSON records here until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::registry()
            .with(RecordLayer::new(LogFormat::Json, move || writer.clone()));
        tracing::subscriber::set_default(subscriber)
    }

    pub fn records(&self) -> Vec<Value> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("JSON record"))
            .collect()
    }

    /// Records with the given message.
    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["message"] == message)
            .collect()
    }
}

/// Send a GET through the router without a listener.
pub async fn get(router: &Router, path: &str) -> Response<Body> {
    send(router, Request::get(path).body(Body::empty()).unwrap()).await
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("JSON body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A server listening on an ephemeral port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub metrics_addr: Option<SocketAddr>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) -> std::io::Result<()> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server should stop")
            .expect("server task should not panic")
    }
}

/// Start `server` on 127.0.0.1:0, plus a metrics listener when it has a metrics router.
pub async fn spawn(server: HttpServer) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let metrics_listener = match server.metrics_router() {
        Some(_) => Some(TcpListener::bind("127.0.0.1:0").await.unwrap()),
        None => None,
    };
    let metrics_addr = metrics_listener
        .as_ref()
        .map(|listener| listener.local_addr().unwrap());

    let shutdown = Shutdown::new();
    let stop = shutdown.clone();
    let task = tokio::spawn(async move { server.run(listener, metrics_listener, &stop).await });

    RunningServer {
        addr,
        metrics_addr,
        shutdown,
        task,
    }
}
