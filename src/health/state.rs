//! Process readiness state.
//!
//! # States
//! - Starting: process is up but the listener is not yet serving
//! - Ready: startup completed, traffic accepted
//! - Draining: shutdown requested, readiness withdrawn
//!
//! # State Transitions
//! ```text
//! Starting → Ready: listener bound
//! Ready → Draining: shutdown signal received
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared readiness flag, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    ready: Arc<AtomicBool>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn mark_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
