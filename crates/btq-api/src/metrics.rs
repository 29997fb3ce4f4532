//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "btq_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "btq_http_request_duration_seconds";

    // Queue metrics
    pub const PENDING_LENGTH: &str = "btq_pending_tasks";
    pub const TASKS_SUBMITTED_TOTAL: &str = "btq_tasks_submitted_total";
    pub const TASKS_CLAIMED_TOTAL: &str = "btq_tasks_claimed_total";
    pub const TASKS_COMPLETED_TOTAL: &str = "btq_tasks_completed_total";
    pub const TASKS_FAILED_TOTAL: &str = "btq_tasks_failed_total";
    pub const EMPTY_POLLS_TOTAL: &str = "btq_empty_polls_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update pending list length gauge.
pub fn set_pending_length(length: u64) {
    gauge!(names::PENDING_LENGTH).set(length as f64);
}

pub fn record_task_submitted() {
    counter!(names::TASKS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_task_claimed() {
    counter!(names::TASKS_CLAIMED_TOTAL).increment(1);
}

pub fn record_task_completed() {
    counter!(names::TASKS_COMPLETED_TOTAL).increment(1);
}

pub fn record_task_failed() {
    counter!(names::TASKS_FAILED_TOTAL).increment(1);
}

/// A worker polled and found nothing to do.
pub fn record_empty_poll() {
    counter!(names::EMPTY_POLLS_TOTAL).increment(1);
}

/// Only the known routes are used as label values so that scanners cannot
/// blow up label cardinality.
fn path_label(path: &str) -> &'static str {
    match path {
        "/api/submit-task" => "/api/submit-task",
        "/api/get-pending-task" => "/api/get-pending-task",
        "/health" | "/healthz" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Metrics middleware to record request metrics.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = path_label(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_label() {
        assert_eq!(path_label("/api/submit-task"), "/api/submit-task");
        assert_eq!(path_label("/healthz"), "/health");
        assert_eq!(path_label("/wp-admin/setup.php"), "other");
    }
}
