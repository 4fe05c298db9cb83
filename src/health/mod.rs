//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /api/v1/healthz
//!     → registry.rs runs every registered check concurrently
//!     → check.rs implementations, each bounded by a timeout
//!     → HealthReport (healthy iff every check is ok)
//!
//! Readiness (state.rs):
//!     Starting → Ready (listener bound) → Draining (shutdown)
//! ```
//!
//! # Design Decisions
//! - Checks are registered at startup, never discovered at runtime
//! - A check that exceeds its timeout is failed, not awaited
//! - Failure detail is logged; callers only see which checks failed

pub mod check;
pub mod registry;
pub mod state;

pub use check::{ApplicationCheck, HealthCheck, HealthCheckFailure};
pub use registry::{CheckOutcome, HealthRegistry, HealthReport, HealthStatus};
pub use state::Readiness;
