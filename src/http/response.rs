//! Error responses.
//!
//! # Responsibilities
//! - Render generic JSON error bodies (no internal detail)
//! - Carry the real failure to the middleware via response extensions
//!
//! # Design Decisions
//! - Handlers return [`AppError`]; its response is a bare 500 plus a
//!   [`HandlerFailure`] extension
//! - The request middleware replaces any failed response's body with
//!   [`ErrorBody`], which includes the correlation id

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::request::RequestId;

/// Generic error body returned to callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub request_id: String,
}

impl ErrorBody {
    pub fn new(error: &'static str, message: &'static str, request_id: &RequestId) -> Self {
        Self {
            error,
            message,
            timestamp: now_rfc3339(),
            request_id: request_id.to_string(),
        }
    }

    pub fn internal(request_id: &RequestId) -> Self {
        Self::new(
            "internal_error",
            "An internal error occurred while processing the request",
            request_id,
        )
    }

    pub fn not_found(request_id: &RequestId) -> Self {
        Self::new("not_found", "The requested resource does not exist", request_id)
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Status returned when a request exceeds `TIMEOUT`. No handler produces it
/// directly, so the middleware can attribute it to the timeout layer.
pub const TIMEOUT_STATUS: StatusCode = StatusCode::GATEWAY_TIMEOUT;

/// Current UTC time, RFC 3339 with microseconds.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Category of a failed request, used as the `kind` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Panic,
    Handler,
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Panic => "panic",
            FailureKind::Handler => "handler",
            FailureKind::Timeout => "timeout",
        }
    }
}

/// Server-side description of why a request failed.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl HandlerFailure {
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "handler panicked".to_string()
        };
        Self {
            kind: FailureKind::Panic,
            detail,
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: FailureKind::Timeout,
            detail: "request exceeded the configured timeout".to_string(),
        }
    }
}

/// Errors raised by handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("hostname could not be resolved at startup")]
    HostnameUnavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(HandlerFailure {
            kind: FailureKind::Handler,
            detail: self.to_string(),
        });
        response
    }
}
