//! Prometheus counters for load-generation outcomes

use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder};

static REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!("loadgen_requests_total", "Completed requests by outcome", &["outcome"])
        .expect("loadgen_requests_total registers once")
});
static TOKENS: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("loadgen_estimated_tokens_total", "Estimated generated tokens (chars / 4)")
        .expect("loadgen_estimated_tokens_total registers once")
});
static LATENCY: Lazy<Histogram> = Lazy::new(|| {
    prometheus::register_histogram!(
        "loadgen_request_latency_seconds",
        "Request latency up to stream end or failure",
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("loadgen_request_latency_seconds registers once")
});

pub fn init() {
    let _ = &*REQUESTS;
    let _ = &*TOKENS;
    let _ = &*LATENCY;
}

/// Records one finished unit of work.
pub fn observe(success: bool, latency_secs: f64, tokens: u64) {
    let label = if success { "success" } else { "error" };
    REQUESTS.with_label_values(&[label]).inc();
    TOKENS.inc_by(tokens);
    LATENCY.observe(latency_secs);
}

/// Text exposition of everything in the default registry.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(target: "obs", "failed to encode metrics: {}", err);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
