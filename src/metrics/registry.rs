// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry, CounterVec,
    Encoder, HistogramVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Total number of API requests
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("requests_total", "Total number of API requests"),
        &["endpoint", "status_code", "streaming"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // UPSTREAM API METRICS
    // ============================================================================

    /// Total upstream chat completion calls
    pub static ref UPSTREAM_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("upstream_calls_total", "Total upstream chat completion calls"),
        &["status_code", "streaming"],
        REGISTRY
    ).unwrap();

    /// Upstream time to response headers
    pub static ref UPSTREAM_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("upstream_duration_seconds", "Upstream call duration until headers")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["streaming"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // TOKEN METRICS
    // ============================================================================

    /// Total tokens processed
    pub static ref TOKENS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output
        REGISTRY
    ).unwrap();

    // ============================================================================
    // STREAMING METRICS
    // ============================================================================

    /// SSE events sent
    pub static ref SSE_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("sse_events_total", "Total SSE events sent"),
        &["event_type"],
        REGISTRY
    ).unwrap();

    /// SSE connection events
    pub static ref SSE_CONNECTIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("sse_connections_total", "Total SSE connections"),
        &["status"], // status: opened, completed, cancelled, error
        REGISTRY
    ).unwrap();

    /// Upstream frames that could not be used
    pub static ref FRAME_ERRORS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("frame_errors_total", "Upstream SSE frames skipped or failed"),
        &["kind"], // kind: parse, transport
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Vector metrics only show up once a label set has been touched
        REQUESTS_TOTAL.with_label_values(&["/v1/messages", "200", "false"]).inc();
        TOKENS_TOTAL.with_label_values(&["test-model", "output"]).inc_by(1.0);
        SSE_EVENTS.with_label_values(&["message_start"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("requests_total"));
        assert!(metrics.contains("tokens_total"));
        assert!(metrics.contains("sse_events_total"));
    }
}
