//! Instance metadata reported by `/api/v1/info`.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::config::{Config, Environment};

/// Messages rotated through the info response.
pub const MESSAGES: &[&str] = &[
    "All systems nominal.",
    "Serving requests with structured logs and Prometheus metrics.",
    "Correlation ids flow through every log record.",
    "Health checks are bounded by timeouts.",
    "Configuration comes from the environment.",
];

const HOSTNAME_FILES: &[&str] = &["/proc/sys/kernel/hostname", "/etc/hostname"];

/// Metadata captured once at startup.
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    hostname: Option<String>,
    environment: Environment,
    version: String,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl InstanceInfo {
    /// Capture metadata, resolving the hostname now.
    pub fn capture(config: &Config) -> Self {
        let hostname = resolve_hostname();
        if hostname.is_none() {
            tracing::warn!("hostname could not be resolved; /api/v1/info will fail");
        }
        Self::new(hostname, config)
    }

    pub fn new(hostname: Option<String>, config: &Config) -> Self {
        Self {
            hostname,
            environment: config.environment,
            version: config.version.clone(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since startup, from the monotonic clock.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Hostname from `HOSTNAME`, falling back to the kernel and `/etc/hostname`.
pub fn resolve_hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .and_then(non_blank)
        .or_else(|| {
            HOSTNAME_FILES
                .iter()
                .find_map(|path| read_trimmed(Path::new(path)))
        })
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().and_then(non_blank)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Pick an informational message at random.
pub fn random_message() -> &'static str {
    MESSAGES[fastrand::usize(..MESSAGES.len())]
}
