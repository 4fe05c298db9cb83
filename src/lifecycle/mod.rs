//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (already validated) → Initialize subsystems → Bind listeners → Ready
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Readiness withdrawn → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: metrics first, then health and info, then listeners
//! - Ordered shutdown: withdraw readiness, stop accept, drain in-flight requests

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
