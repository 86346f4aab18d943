use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Names of the metrics the service records.
pub const TRYON_SUBMITTED: &str = "tryon_jobs_submitted_total";
pub const TRYON_SUCCEEDED: &str = "tryon_jobs_succeeded_total";
pub const TRYON_FAILED: &str = "tryon_jobs_failed_total";
pub const TRYON_TIMED_OUT: &str = "tryon_jobs_timed_out_total";
pub const TRYON_GENERATION_SECONDS: &str = "tryon_generation_seconds";
pub const BOOKINGS_CREATED: &str = "bookings_created_total";

/// Register descriptions with the installed recorder.
pub fn describe() {
    metrics::describe_counter!(TRYON_SUBMITTED, "Try-on jobs accepted by the generation service");
    metrics::describe_counter!(TRYON_SUCCEEDED, "Try-on jobs that produced an image");
    metrics::describe_counter!(TRYON_FAILED, "Try-on jobs that failed after submission");
    metrics::describe_counter!(TRYON_TIMED_OUT, "Try-on jobs abandoned at the poll timeout");
    metrics::describe_histogram!(
        TRYON_GENERATION_SECONDS,
        metrics::Unit::Seconds,
        "Time from the first status poll to a generated image"
    );
    metrics::describe_counter!(BOOKINGS_CREATED, "Orders placed through booking submission");
}

/// GET /metrics — Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
