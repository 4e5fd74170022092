//! Prometheus metrics for dispatch monitoring
//!
//! Exposes metrics for:
//! - Dispatches by action and path
//! - Failures by error kind
//! - Approvals and confirmed transactions per chain
//! - Confirmation latency

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    pub static ref DISPATCHES: CounterVec = register_counter_vec!(
        "omnilend_dispatches_total",
        "Actions dispatched by action kind and execution path",
        &["action", "path"]
    ).unwrap();

    pub static ref DISPATCHES_SETTLED: CounterVec = register_counter_vec!(
        "omnilend_dispatches_settled_total",
        "Actions that reached the settled state",
        &["action", "path"]
    ).unwrap();

    pub static ref DISPATCH_FAILURES: CounterVec = register_counter_vec!(
        "omnilend_dispatch_failures_total",
        "Failed dispatches by error kind",
        &["kind"]
    ).unwrap();

    pub static ref APPROVALS_SUBMITTED: CounterVec = register_counter_vec!(
        "omnilend_approvals_submitted_total",
        "Token approvals submitted before direct actions",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_CONFIRMED: CounterVec = register_counter_vec!(
        "omnilend_transactions_confirmed_total",
        "Transactions that reached their required confirmation depth",
        &["chain_id"]
    ).unwrap();

    pub static ref CONFIRMATION_LATENCY: HistogramVec = register_histogram_vec!(
        "omnilend_confirmation_latency_seconds",
        "Time from submission to required confirmation depth",
        &["path"],
        vec![1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();
}

/// Text exposition of every registered metric
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

// Helper functions to record metrics

pub fn record_dispatch(action: &str, path: &str) {
    DISPATCHES.with_label_values(&[action, path]).inc();
}

pub fn record_settled(action: &str, path: &str) {
    DISPATCHES_SETTLED.with_label_values(&[action, path]).inc();
}

pub fn record_failure(kind: &str) {
    DISPATCH_FAILURES.with_label_values(&[kind]).inc();
}

pub fn record_approval_submitted(chain_id: u64) {
    APPROVALS_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_confirmed(chain_id: u64) {
    TX_CONFIRMED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_confirmation_latency(path: &str, latency_secs: f64) {
    CONFIRMATION_LATENCY
        .with_label_values(&[path])
        .observe(latency_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_series() {
        record_failure("unknown_chain");
        let text = render();
        assert!(text.contains("omnilend_dispatch_failures_total"));
        assert!(text.contains("kind=\"unknown_chain\""));
    }
}
