//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (request count, latency, in-flight requests)
//! - Render them in Prometheus text exposition format
//! - Track failures and health check outcomes
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status class
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_requests_in_progress` (gauge): requests currently being handled
//! - `http_request_failures_total` (counter): panics, handler errors, timeouts by route
//! - `health_check_status` (gauge): 1=ok, 0=failed, per check
//! - `app_info` (gauge): constant 1 labelled with version and environment
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations inside the recorder)
//! - The recorder is owned by [`Metrics`] and used as a local recorder, so
//!   nothing is installed globally and every test gets its own registry
//! - Route labels are templates, never raw paths
//! - Histogram buckets tuned for typical web latencies, fixed at construction

use std::sync::Arc;
use std::time::Duration;

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    with_local_recorder, Label, Unit,
};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const REQUESTS_IN_PROGRESS: &str = "http_requests_in_progress";
pub const REQUEST_FAILURES_TOTAL: &str = "http_request_failures_total";
pub const HEALTH_CHECK_STATUS: &str = "health_check_status";
pub const APP_INFO: &str = "app_info";

/// Latency buckets in seconds.
pub const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Process-wide metrics registry, cheap to clone.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

struct Inner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Metrics {
    /// Build a registry with fixed histogram buckets.
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
                DURATION_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_counter!(REQUESTS_TOTAL, Unit::Count, "Total HTTP requests handled");
            describe_histogram!(
                REQUEST_DURATION_SECONDS,
                Unit::Seconds,
                "HTTP request latency"
            );
            describe_gauge!(REQUESTS_IN_PROGRESS, "HTTP requests currently in flight");
            describe_counter!(
                REQUEST_FAILURES_TOTAL,
                Unit::Count,
                "Requests that panicked, errored, or timed out"
            );
            describe_gauge!(HEALTH_CHECK_STATUS, "Last health check outcome (1=ok, 0=failed)");
            describe_gauge!(APP_INFO, "Build and environment information");
        });

        Ok(Self {
            inner: Arc::new(Inner { recorder, handle }),
        })
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        with_local_recorder(&self.inner.recorder, f)
    }

    /// Record one completed request.
    pub fn record_request(&self, method: &str, route: &str, status_class: &str, duration: Duration) {
        let labels = vec![
            Label::new("method", method.to_string()),
            Label::new("route", route.to_string()),
            Label::new("status", status_class.to_string()),
        ];
        self.with_recorder(|| {
            counter!(REQUESTS_TOTAL, labels.clone()).increment(1);
            histogram!(REQUEST_DURATION_SECONDS, labels).record(duration.as_secs_f64());
        });
    }

    /// Record a request that ended in a panic, handler error, or timeout.
    pub fn record_failure(&self, route: &str, kind: &str) {
        let labels = vec![
            Label::new("route", route.to_string()),
            Label::new("kind", kind.to_string()),
        ];
        self.with_recorder(|| counter!(REQUEST_FAILURES_TOTAL, labels).increment(1));
    }

    pub fn inc_active(&self) {
        self.with_recorder(|| gauge!(REQUESTS_IN_PROGRESS).increment(1.0));
    }

    pub fn dec_active(&self) {
        self.with_recorder(|| gauge!(REQUESTS_IN_PROGRESS).decrement(1.0));
    }

    /// Count a request as in flight until the returned guard is released or dropped.
    pub fn track_active(&self) -> ActiveRequestGuard {
        self.inc_active();
        ActiveRequestGuard {
            metrics: self.clone(),
            released: false,
        }
    }

    pub fn set_health_check(&self, check: &str, ok: bool) {
        let labels = vec![Label::new("check", check.to_string())];
        let value = if ok { 1.0 } else { 0.0 };
        self.with_recorder(|| gauge!(HEALTH_CHECK_STATUS, labels).set(value));
    }

    pub fn set_app_info(&self, version: &str, environment: &str) {
        let labels = vec![
            Label::new("version", version.to_string()),
            Label::new("environment", environment.to_string()),
        ];
        self.with_recorder(|| gauge!(APP_INFO, labels).set(1.0));
    }

    /// Render all series in Prometheus text format.
    pub fn snapshot(&self) -> String {
        self.inner.handle.render()
    }

    /// Drain histogram samples into their buckets.
    ///
    /// Called periodically so memory stays bounded between scrapes.
    pub fn run_upkeep(&self) {
        self.inner.handle.run_upkeep();
    }

    #[cfg(test)]
    fn sample(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        find_sample(&self.snapshot(), name, labels)
    }
}

/// Look up a sample in Prometheus text output.
pub fn find_sample(exposition: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    exposition
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.rsplit_once(' '))
        .find(|(series, _)| {
            let series_name = series.split('{').next().unwrap_or(series);
            series_name == name
                && labels
                    .iter()
                    .all(|(key, value)| series.contains(&format!("{}=\"{}\"", key, value)))
        })
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// Keeps a request counted in `http_requests_in_progress`.
///
/// Dropping the guard without calling [`release`](Self::release) still
/// decrements, so cancelled requests never leak the gauge.
pub struct ActiveRequestGuard {
    metrics: Metrics,
    released: bool,
}

impl ActiveRequestGuard {
    pub fn release(mut self) {
        self.released = true;
        self.metrics.dec_active();
    }
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        if !self.released {
            self.metrics.dec_active();
        }
    }
}
