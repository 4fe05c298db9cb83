//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, listeners)
//!     → middleware (request id, timing, metrics, completion log)
//!     → handlers.rs (healthz, livez, info, metrics, fallback)
//!     → response.rs (generic error bodies)
//!     → Send to client with x-request-id
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::{status_class, RequestId, X_REQUEST_ID};
pub use response::{AppError, ErrorBody, HandlerFailure};
pub use server::{AppState, HttpServer};
