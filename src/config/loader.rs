//! Configuration loading from the process environment.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::config::schema::{
    Config, Environment, HealthConfig, LogFormat, LogLevel, LoggingConfig, MetricsConfig,
    RuntimeConfig, Secret, SecretsConfig, ServerConfig,
};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is present but could not be coerced to its type.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The parsed configuration failed semantic checks.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from the process environment.
pub fn load() -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = std::env::vars_os()
        .map(|(name, value)| {
            (
                name.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect();
    load_from(&vars)
}

/// Load and validate configuration from an explicit variable mapping.
///
/// Empty or whitespace-only values are treated as absent.
pub fn load_from(vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
    let env = Env { vars };

    let environment = env.parse("APP_ENV", Environment::default())?;
    let defaults = Config::default();
    let log_defaults = LoggingConfig::for_environment(environment);

    let config = Config {
        environment,
        version: env
            .raw("APP_VERSION")
            .map(str::to_string)
            .unwrap_or(defaults.version),
        server: ServerConfig {
            host: env
                .raw("HOST")
                .map(str::to_string)
                .unwrap_or(defaults.server.host),
            port: env.parse("PORT", defaults.server.port)?,
        },
        logging: LoggingConfig {
            level: env.parse::<LogLevel>("LOG_LEVEL", log_defaults.level)?,
            format: env.parse::<LogFormat>("LOG_FORMAT", log_defaults.format)?,
        },
        metrics: MetricsConfig {
            enabled: env.flag("ENABLE_METRICS", defaults.metrics.enabled)?,
            port: env.parse_optional("METRICS_PORT")?,
            path: env
                .raw("METRICS_PATH")
                .map(str::to_string)
                .unwrap_or(defaults.metrics.path),
        },
        secrets: SecretsConfig {
            api_key: env.raw("API_KEY").map(Secret::new),
            jwt_secret: env.raw("JWT_SECRET").map(Secret::new),
        },
        runtime: RuntimeConfig {
            workers: env.parse("WORKERS", defaults.runtime.workers)?,
            threads: env.parse("THREADS", defaults.runtime.threads)?,
            timeout_secs: env.parse("TIMEOUT", defaults.runtime.timeout_secs)?,
            keepalive_secs: env.parse("KEEPALIVE", defaults.runtime.keepalive_secs)?,
            max_requests: env.parse("MAX_REQUESTS", defaults.runtime.max_requests)?,
        },
        health: HealthConfig {
            check_timeout_ms: env
                .parse("HEALTH_CHECK_TIMEOUT_MS", defaults.health.check_timeout_ms)?,
        },
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Typed lookups over a variable mapping.
struct Env<'a> {
    vars: &'a HashMap<String, String>,
}

impl<'a> Env<'a> {
    fn raw(&self, name: &str) -> Option<&'a str> {
        self.vars
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.parse_optional(name)?.unwrap_or(default))
    }

    fn parse_optional<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.raw(name)
            .map(|value| {
                value.parse::<T>().map_err(|e| ConfigError::Invalid {
                    field: name,
                    reason: format!("{:?}: {}", value, e),
                })
            })
            .transpose()
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.raw(name) {
            None => Ok(default),
            Some(value) => parse_bool(value).ok_or_else(|| ConfigError::Invalid {
                field: name,
                reason: format!("{:?}: expected true or false", value),
            }),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
