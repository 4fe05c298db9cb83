//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (the loader handles type coercion)
//! - Require credentials when running in production
//! - Validate value ranges (ports non-zero, thread counts positive)
//! - Keep the metrics path clear of the API namespace
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::Config;
use crate::http::routes::API_PREFIX;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Environment variable the problem refers to.
    pub field: &'static str,
    /// Human-readable explanation.
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.environment.is_production() {
        if config.secrets.api_key.is_none() {
            errors.push(ValidationError::new("API_KEY", "required when APP_ENV=production"));
        }
        if config.secrets.jwt_secret.is_none() {
            errors.push(ValidationError::new("JWT_SECRET", "required when APP_ENV=production"));
        }
    }

    if config.server.port == 0 {
        errors.push(ValidationError::new("PORT", "must be between 1 and 65535"));
    }
    if config.metrics.port == Some(0) {
        errors.push(ValidationError::new("METRICS_PORT", "must be between 1 and 65535"));
    }

    let path = &config.metrics.path;
    if let Some(reason) = metrics_path_problem(path) {
        errors.push(ValidationError::new("METRICS_PATH", reason));
    } else if path == API_PREFIX || path.starts_with(&format!("{}/", API_PREFIX)) {
        errors.push(ValidationError::new(
            "METRICS_PATH",
            format!("must not be under {}", API_PREFIX),
        ));
    }

    if config.runtime.workers == 0 {
        errors.push(ValidationError::new("WORKERS", "must be at least 1"));
    }
    if config.runtime.threads == 0 {
        errors.push(ValidationError::new("THREADS", "must be at least 1"));
    }
    if config.runtime.timeout_secs == 0 {
        errors.push(ValidationError::new("TIMEOUT", "must be at least 1 second"));
    }
    if config.health.check_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "HEALTH_CHECK_TIMEOUT_MS",
            "must be at least 1 millisecond",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The metrics path is mounted as a literal route, so it must be a plain
/// `/segment/segment` path with no route syntax.
fn metrics_path_problem(path: &str) -> Option<&'static str> {
    let Some(rest) = path.strip_prefix('/') else {
        return Some("must start with '/'");
    };
    if rest.is_empty() {
        return Some("must name a path below '/'");
    }
    if rest.ends_with('/') {
        return Some("must not end with '/'");
    }
    for segment in rest.split('/') {
        if segment.is_empty() {
            return Some("must not contain empty segments ('//')");
        }
        if segment.starts_with(':') {
            return Some("segments must not start with ':'");
        }
        if segment
            .chars()
            .any(|c| matches!(c, '{' | '}' | '*' | '?' | '#') || c.is_whitespace())
        {
            return Some("must be a literal path without '{', '}', '*', '?', '#' or whitespace");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Environment, Secret};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = Config::default();
        config.server.port = 0;
        config.runtime.workers = 0;
        config.metrics.path = "metrics".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_metrics_path_outside_api_namespace() {
        let mut config = Config::default();
        config.metrics.path = "/api/v1/metrics".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "METRICS_PATH");

        config.metrics.path = "/api/v1metrics".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_production_with_secrets_is_valid() {
        let mut config = Config::default();
        config.environment = Environment::Production;
        config.secrets.api_key = Some(Secret::new("key"));
        config.secrets.jwt_secret = Some(Secret::new("jwt"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_path_rejects_route_syntax() {
        let mut config = Config::default();
        for path in [
            "/metrics/{",
            "/metrics/{id}",
            "/metrics/*rest",
            "/metrics/:id",
            "/metrics//raw",
            "/metrics/",
            "/",
            "/met rics",
            "/metrics?x=1",
        ] {
            config.metrics.path = path.to_string();
            let errors = validate_config(&config).unwrap_err();
            assert_eq!(errors.len(), 1, "{}", path);
            assert_eq!(errors[0].field, "METRICS_PATH", "{}", path);
        }

        for path in ["/metrics", "/internal/prom", "/_status/metrics-v2"] {
            config.metrics.path = path.to_string();
            assert!(validate_config(&config).is_ok(), "{}", path);
        }
    }
}
