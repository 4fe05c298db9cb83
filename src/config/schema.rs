//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! Every section has a `Default` so tests can start from `Config::default()`
//! and override only what they exercise.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::observability::redact::REDACTION_MARKER;

/// Root configuration for the service.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Deployment environment (`APP_ENV`).
    pub environment: Environment,

    /// Version reported by `/api/v1/info` and the `app_info` metric.
    pub version: String,

    /// API listener settings.
    pub server: ServerConfig,

    /// Log level and encoding.
    pub logging: LoggingConfig,

    /// Metrics exposition settings.
    pub metrics: MetricsConfig,

    /// Credentials required in production.
    pub secrets: SecretsConfig,

    /// Runtime tuning knobs.
    pub runtime: RuntimeConfig,

    /// Health check settings.
    pub health: HealthConfig,
}

impl Default for Config {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            environment,
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            logging: LoggingConfig::for_environment(environment),
            metrics: MetricsConfig::default(),
            secrets: SecretsConfig::default(),
            runtime: RuntimeConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl Config {
    /// Port of the dedicated metrics listener, if one is needed.
    ///
    /// Returns `None` when metrics are disabled or when they share the API port.
    pub fn metrics_listener_port(&self) -> Option<u16> {
        if !self.metrics.enabled {
            return None;
        }
        self.metrics.port.filter(|port| *port != self.server.port)
    }

    /// Whether `/metrics` is mounted on the API router.
    pub fn serves_metrics_inline(&self) -> bool {
        self.metrics.enabled && self.metrics_listener_port().is_none()
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            _ => Err("expected one of development, staging, production".to_string()),
        }
    }
}

/// API listener configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Interface to bind (`HOST`).
    pub host: String,

    /// Port to bind (`PORT`).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Log verbosity, named the way operators set it in `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// `EnvFilter` directive for this level. `CRITICAL` has no tracing
    /// counterpart and maps to `error`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err("expected one of DEBUG, INFO, WARNING, ERROR, CRITICAL".to_string()),
        }
    }
}

/// Log record encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable `key=value` lines.
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            _ => Err("expected one of json, text".to_string()),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Defaults for an environment: verbose in development, `INFO` elsewhere.
    pub fn for_environment(environment: Environment) -> Self {
        let level = match environment {
            Environment::Development => LogLevel::Debug,
            Environment::Staging | Environment::Production => LogLevel::Info,
        };
        Self {
            level,
            format: LogFormat::default(),
        }
    }
}

/// Metrics exposition configuration.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsConfig {
    /// Mount the scrape endpoint (`ENABLE_METRICS`).
    pub enabled: bool,

    /// Dedicated listener port (`METRICS_PORT`). `None` serves metrics on the API port.
    pub port: Option<u16>,

    /// Scrape path (`METRICS_PATH`).
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: None,
            path: "/metrics".to_string(),
        }
    }
}

/// A credential that never prints its value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTION_MARKER)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTION_MARKER)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTION_MARKER)
    }
}

/// Credentials. Only validated when running in production.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SecretsConfig {
    pub api_key: Option<Secret>,
    pub jwt_secret: Option<Secret>,
}

/// Runtime tuning passed through to the Tokio runtime and server layers.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeConfig {
    /// Tokio worker threads (`WORKERS`).
    pub workers: usize,

    /// Maximum blocking-pool threads (`THREADS`).
    pub threads: usize,

    /// Per-request timeout in seconds (`TIMEOUT`).
    pub timeout_secs: u64,

    /// Keep-alive in seconds (`KEEPALIVE`). Reported only.
    pub keepalive_secs: u64,

    /// Requests per worker before recycling (`MAX_REQUESTS`, 0 = unlimited). Reported only.
    pub max_requests: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            threads: 512,
            timeout_secs: 30,
            keepalive_secs: 5,
            max_requests: 0,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Serialize)]
pub struct HealthConfig {
    /// Default per-check timeout in milliseconds (`HEALTH_CHECK_TIMEOUT_MS`).
    pub check_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: 2000,
        }
    }
}
