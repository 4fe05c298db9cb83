//! vitals: a minimal status microservice.
//!
//! Serves `/api/v1/healthz`, `/api/v1/livez`, `/api/v1/info` and a Prometheus
//! scrape endpoint, with structured logging and per-request correlation ids.

// Core subsystems
pub mod config;
pub mod http;
pub mod info;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::Config;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
