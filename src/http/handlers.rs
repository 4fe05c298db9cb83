//! Endpoint handlers.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::SecondsFormat;
use serde::Serialize;

use crate::config::Environment;
use crate::health::{CheckOutcome, HealthStatus};
use crate::http::request::RequestId;
use crate::http::response::{now_rfc3339, AppError, ErrorBody};
use crate::http::server::AppState;
use crate::info::random_message;

/// Body of `/api/v1/healthz`.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: HealthStatus,
    pub timestamp: String,
    pub checks: BTreeMap<String, CheckOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness: 200 when every sub-check is ok, 503 otherwise.
pub async fn healthz(State(state): State<AppState>) -> Response {
    let report = state.health.run().await;

    for (name, outcome) in &report.checks {
        state
            .metrics
            .set_health_check(name, *outcome == CheckOutcome::Ok);
    }
    for (name, failure) in &report.failures {
        tracing::warn!(
            check = %name,
            error.kind = failure.kind(),
            error.message = %failure,
            "health check failed"
        );
    }

    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = HealthBody {
        status: report.status,
        timestamp: report.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        error: report.error_summary(),
        checks: report.checks,
    };
    (status, Json(body)).into_response()
}

#[derive(Debug, Serialize)]
pub struct LivenessBody {
    pub status: &'static str,
    pub timestamp: String,
}

/// Liveness: 200 whenever the process can answer.
pub async fn livez() -> Json<LivenessBody> {
    Json(LivenessBody {
        status: "alive",
        timestamp: now_rfc3339(),
    })
}

/// Body of `/api/v1/info`.
#[derive(Debug, Serialize)]
pub struct InfoBody {
    pub hostname: String,
    pub current_time: String,
    pub message: &'static str,
    pub environment: Environment,
    pub version: String,
    /// Whole seconds since startup.
    pub uptime: u64,
    pub started_at: String,
    pub request_id: String,
}

pub async fn info(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<InfoBody>, AppError> {
    let info = &state.info;
    let hostname = info.hostname().ok_or(AppError::HostnameUnavailable)?;

    Ok(Json(InfoBody {
        hostname: hostname.to_string(),
        current_time: now_rfc3339(),
        message: random_message(),
        environment: info.environment(),
        version: info.version().to_string(),
        uptime: info.uptime().as_secs(),
        started_at: info
            .started_at()
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        request_id: request_id.to_string(),
    }))
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.snapshot(),
    )
}

pub async fn not_found(Extension(request_id): Extension<RequestId>) -> Response {
    ErrorBody::not_found(&request_id).into_response_with(StatusCode::NOT_FOUND)
}
