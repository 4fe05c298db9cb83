//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log records via tracing)
//!     → redact.rs (sensitive fields masked before encoding)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all log records via the request span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod redact;

pub use metrics::{ActiveRequestGuard, Metrics};
pub use redact::{Structured, REDACTION_MARKER};
