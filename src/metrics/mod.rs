//! Prometheus metrics for transaction outcomes
//!
//! Exposes metrics for:
//! - Submissions and confirmations
//! - Failures by stage, silent dismissals, timeouts
//! - Confirmation latency

use crate::tx::ErrorStage;

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "txflow_transactions_submitted_total",
        "Total transactions accepted by the wallet",
        &["network"]
    ).unwrap();

    pub static ref TX_CONFIRMED: CounterVec = register_counter_vec!(
        "txflow_transactions_confirmed_total",
        "Total transactions with a successful receipt",
        &["network"]
    ).unwrap();

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "txflow_transactions_failed_total",
        "Total reported transaction failures",
        &["network", "stage"]
    ).unwrap();

    pub static ref TX_DENIED: CounterVec = register_counter_vec!(
        "txflow_transactions_denied_total",
        "Total failures dismissed without a message",
        &["network"]
    ).unwrap();

    pub static ref TX_TIMED_OUT: CounterVec = register_counter_vec!(
        "txflow_transactions_timed_out_total",
        "Total transactions with no receipt before the poller gave up",
        &["network"]
    ).unwrap();

    pub static ref TX_LATENCY: HistogramVec = register_histogram_vec!(
        "txflow_confirmation_latency_seconds",
        "Time from invocation to successful receipt",
        &["network"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    ).unwrap();
}

/// Render all metrics in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

// Helper functions to record metrics

pub fn record_tx_submitted(network: &str) {
    TX_SUBMITTED.with_label_values(&[network]).inc();
}

pub fn record_tx_confirmed(network: &str, latency_secs: f64) {
    TX_CONFIRMED.with_label_values(&[network]).inc();
    TX_LATENCY.with_label_values(&[network]).observe(latency_secs);
}

pub fn record_tx_failed(network: &str, stage: ErrorStage) {
    TX_FAILED.with_label_values(&[network, stage.as_str()]).inc();
}

pub fn record_tx_denied(network: &str) {
    TX_DENIED.with_label_values(&[network]).inc();
}

pub fn record_tx_timed_out(network: &str) {
    TX_TIMED_OUT.with_label_values(&[network]).inc();
}
