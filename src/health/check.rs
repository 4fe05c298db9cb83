//! Health sub-checks.
//!
//! A sub-check is a named test with a bounded running time. Checks are
//! registered with the [`HealthRegistry`](super::HealthRegistry) at startup.

use std::time::Duration;

use async_trait::async_trait;

use crate::health::state::Readiness;

/// Why a sub-check did not report ok.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthCheckFailure {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl HealthCheckFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            HealthCheckFailure::Failed(_) => "failed",
            HealthCheckFailure::TimedOut(_) => "timeout",
        }
    }
}

/// A named component of the health aggregation.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Name reported under `checks` in the health body.
    fn name(&self) -> &str;

    /// Upper bound for [`check`](Self::check). `None` uses the registry default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn check(&self) -> Result<(), HealthCheckFailure>;
}

/// Reports ok once the process has completed startup.
pub struct ApplicationCheck {
    readiness: Readiness,
}

impl ApplicationCheck {
    pub const NAME: &'static str = "application";

    pub fn new(readiness: Readiness) -> Self {
        Self { readiness }
    }
}

#[async_trait]
impl HealthCheck for ApplicationCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn check(&self) -> Result<(), HealthCheckFailure> {
        if self.readiness.is_ready() {
            Ok(())
        } else {
            Err(HealthCheckFailure::Failed("startup not complete".to_string()))
        }
    }
}
