//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (NAME=value)
//!     → loader.rs (defaults, type coercion, enum membership)
//!     → validation.rs (semantic checks, production secrets)
//!     → Config (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup and never reloaded
//! - Every setting has a default except production secrets
//! - Type errors fail fast; semantic errors are reported together

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_from, ConfigError};
pub use schema::{
    Config, Environment, HealthConfig, LogFormat, LogLevel, LoggingConfig, MetricsConfig,
    RuntimeConfig, Secret, SecretsConfig, ServerConfig,
};
pub use validation::ValidationError;
