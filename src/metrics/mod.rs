// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, FRAME_ERRORS, REQUESTS_TOTAL, SSE_CONNECTIONS, SSE_EVENTS, TOKENS_TOTAL,
    UPSTREAM_CALLS, UPSTREAM_DURATION,
};

/// Helper to record request metrics
pub fn record_request(endpoint: &str, status_code: u16, streaming: bool) {
    REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status_code.to_string(), &streaming.to_string()])
        .inc();
}

/// Helper to record upstream API call metrics
pub fn record_upstream_call(status_code: u16, streaming: bool, duration_secs: f64) {
    UPSTREAM_CALLS
        .with_label_values(&[&status_code.to_string(), &streaming.to_string()])
        .inc();

    UPSTREAM_DURATION
        .with_label_values(&[&streaming.to_string()])
        .observe(duration_secs);
}

/// Helper to record token usage
pub fn record_tokens(model: &str, input: u32, output: u32) {
    if input > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "input"])
            .inc_by(input as f64);
    }
    if output > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "output"])
            .inc_by(output as f64);
    }
}

/// Helper to record SSE events
pub fn record_sse_event(event_type: &str) {
    SSE_EVENTS.with_label_values(&[event_type]).inc();
}

pub fn record_sse_connection(status: &str) {
    SSE_CONNECTIONS.with_label_values(&[status]).inc();
}

/// Helper to record unusable upstream frames
pub fn record_frame_error(kind: &str) {
    FRAME_ERRORS.with_label_values(&[kind]).inc();
}
