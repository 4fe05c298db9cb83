//! vitals service entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                      VITALS                      │
//!                      │                                                  │
//!   Client Request     │  ┌──────────┐   ┌───────────────┐   ┌──────────┐ │
//!   ───────────────────┼─▶│ listener │──▶│  middleware   │──▶│ handlers │ │
//!                      │  │  (axum)  │   │ id/time/meter │   │ healthz  │ │
//!                      │  └──────────┘   └───────┬───────┘   │ info     │ │
//!   Client Response    │                         │           │ metrics  │ │
//!   ◀──────────────────┼─────────────────────────┘           └────┬─────┘ │
//!   (x-request-id)     │                                          │       │
//!                      │  ┌───────────────────────────────────────▼─────┐ │
//!                      │  │            Cross-Cutting Concerns           │ │
//!                      │  │  ┌────────┐ ┌────────┐ ┌──────────────────┐ │ │
//!                      │  │  │ config │ │ health │ │  observability   │ │ │
//!                      │  │  │  (env) │ │ checks │ │ logs + metrics   │ │ │
//!                      │  │  └────────┘ └────────┘ └──────────────────┘ │ │
//!                      │  │  ┌───────────────────────────────────────┐  │ │
//!                      │  │  │   lifecycle: startup / shutdown       │  │ │
//!                      │  │  └───────────────────────────────────────┘  │ │
//!                      │  └─────────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────────┘
//! ```
//!
//! Configuration is loaded before anything else; an invalid environment
//! exits with status 1 before the runtime starts or any port is bound.

use std::process::ExitCode;

use vitals::config;
use vitals::lifecycle::startup;
use vitals::observability::logging;

fn main() -> ExitCode {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vitals: configuration error: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("vitals: failed to initialize logging: {}", e);
        return ExitCode::from(1);
    }
    logging::install_panic_hook();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.runtime.workers)
        .max_blocking_threads(config.runtime.threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(
                error.kind = "runtime",
                error.message = %e,
                "Failed to build runtime"
            );
            return ExitCode::from(1);
        }
    };

    tracing::info!(version = %config.version, "vitals starting");

    match runtime.block_on(startup::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(
                error.kind = e.kind(),
                error.message = %e,
                "Service terminated"
            );
            ExitCode::from(1)
        }
    }
}
