//! Request tracking middleware.
//!
//! Every request passes through the same stages, on success and failure alike:
//!
//! ```text
//! identify (x-request-id) → time → handle (panics caught)
//!     → record metrics → log completion → respond with x-request-id
//! ```

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use tracing::Instrument;

use crate::http::request::{status_class, RequestId, X_REQUEST_ID};
use crate::http::response::{ErrorBody, FailureKind, HandlerFailure, TIMEOUT_STATUS};
use crate::http::routes;
use crate::http::server::AppState;

/// Assigns the correlation id, times the handler, records metrics, and logs
/// one completion record per request.
pub async fn track_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::from_headers(request.headers());
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| routes::UNMATCHED.to_string());

    request.extensions_mut().insert(request_id.clone());
    request
        .headers_mut()
        .insert(&X_REQUEST_ID, request_id.header_value());

    // Error level so the span's fields survive any LOG_LEVEL filter.
    let span = tracing::error_span!(
        "request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    async move {
        let started = Instant::now();
        let active = state.metrics.track_active();

        let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;
        let elapsed = started.elapsed();

        let (mut response, failure) = match outcome {
            Ok(response) => {
                let failure = response
                    .extensions()
                    .get::<HandlerFailure>()
                    .cloned()
                    .or_else(|| {
                        (response.status() == TIMEOUT_STATUS)
                            .then(HandlerFailure::timeout)
                    });
                (response, failure)
            }
            Err(payload) => (
                StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                Some(HandlerFailure::from_panic(payload)),
            ),
        };

        if let Some(failure) = &failure {
            let body = match failure.kind {
                FailureKind::Timeout => ErrorBody::new(
                    "timeout",
                    "The request took too long to complete",
                    &request_id,
                ),
                FailureKind::Panic | FailureKind::Handler => ErrorBody::internal(&request_id),
            };
            response = body.into_response_with(response.status());
        }

        let status = response.status();
        state
            .metrics
            .record_request(method.as_str(), &route, status_class(status), elapsed);
        if let Some(failure) = &failure {
            state.metrics.record_failure(&route, failure.kind.as_str());
        }
        active.release();

        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        match &failure {
            Some(failure) => tracing::error!(
                request_id = request_id.as_str(),
                method = method.as_str(),
                route = route.as_str(),
                status = status.as_u16(),
                duration_ms,
                error.kind = failure.kind.as_str(),
                error.message = %failure.detail,
                "request completed"
            ),
            None if status.is_server_error() => tracing::warn!(
                request_id = request_id.as_str(),
                method = method.as_str(),
                route = route.as_str(),
                status = status.as_u16(),
                duration_ms,
                "request completed"
            ),
            None => tracing::info!(
                request_id = request_id.as_str(),
                method = method.as_str(),
                route = route.as_str(),
                status = status.as_u16(),
                duration_ms,
                "request completed"
            ),
        }

        response
            .headers_mut()
            .insert(&X_REQUEST_ID, request_id.header_value());
        response
    }
    .instrument(span)
    .await
}
