//! Health check registry and aggregation.
//!
//! # Responsibilities
//! - Hold the sub-checks registered at startup
//! - Run them concurrently, each bounded by a timeout
//! - Aggregate: unhealthy iff at least one sub-check failed

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::time;

use crate::health::check::{HealthCheck, HealthCheckFailure};

/// Overall service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of one sub-check as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    Ok,
    Failed,
}

/// Result of one aggregation run.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: BTreeMap<String, CheckOutcome>,
    /// Failure detail per check. Logged, never returned to callers.
    pub failures: Vec<(String, HealthCheckFailure)>,
}

impl HealthReport {
    fn from_results(results: Vec<(String, Result<(), HealthCheckFailure>)>) -> Self {
        let mut checks = BTreeMap::new();
        let mut failures = Vec::new();

        for (name, result) in results {
            match result {
                Ok(()) => {
                    checks.entry(name).or_insert(CheckOutcome::Ok);
                }
                Err(failure) => {
                    checks.insert(name.clone(), CheckOutcome::Failed);
                    failures.push((name, failure));
                }
            }
        }

        let status = if failures.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        Self {
            status,
            timestamp: Utc::now(),
            checks,
            failures,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Caller-facing summary naming the failed checks, if any.
    pub fn error_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.failures.iter().map(|(name, _)| name.as_str()).collect();
        Some(format!("health check failed: {}", names.join(", ")))
    }
}

/// Sub-checks registered at startup.
pub struct HealthRegistry {
    checks: Vec<Arc<dyn HealthCheck>>,
    default_timeout: Duration,
}

impl HealthRegistry {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            checks: Vec::new(),
            default_timeout,
        }
    }

    /// Register a sub-check.
    pub fn with_check(mut self, check: impl HealthCheck + 'static) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Run every sub-check concurrently and aggregate the results.
    ///
    /// A check that exceeds its timeout is reported as failed.
    pub async fn run(&self) -> HealthReport {
        let runs = self.checks.iter().map(|check| {
            let limit = check.timeout().unwrap_or(self.default_timeout);
            async move {
                let result = match time::timeout(limit, check.check()).await {
                    Ok(result) => result,
                    Err(_) => Err(HealthCheckFailure::TimedOut(limit)),
                };
                (check.name().to_string(), result)
            }
        });

        HealthReport::from_results(join_all(runs).await)
    }
}
