//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Pipeline construction
//! - Transformer throughput
//! - Delivery outcomes and latency
//! - Simulator precondition failures

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    pub static ref PIPELINES_BUILT: CounterVec = register_counter_vec!(
        "tesseract_submitter_pipelines_built_total",
        "Total pipelines built by submitter type",
        &["submitter"]
    ).unwrap();

    pub static ref OPERATIONS_TRANSFORMED: CounterVec = register_counter_vec!(
        "tesseract_submitter_operations_transformed_total",
        "Total operations produced by transformers",
        &["transformer", "chain"]
    ).unwrap();

    pub static ref OPERATIONS_DELIVERED: CounterVec = register_counter_vec!(
        "tesseract_submitter_operations_delivered_total",
        "Total operations delivered successfully",
        &["submitter", "chain"]
    ).unwrap();

    pub static ref DELIVERY_FAILURES: CounterVec = register_counter_vec!(
        "tesseract_submitter_delivery_failures_total",
        "Total failed deliveries",
        &["submitter", "chain"]
    ).unwrap();

    pub static ref DELIVERY_LATENCY: HistogramVec = register_histogram_vec!(
        "tesseract_submitter_delivery_latency_seconds",
        "Time from delivery start to receipt or proposal",
        &["submitter", "chain"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();

    pub static ref PRECONDITION_FAILURES: CounterVec = register_counter_vec!(
        "tesseract_submitter_precondition_failures_total",
        "Total simulator reachability or fork failures",
        &["chain"]
    ).unwrap();
}

/// Render every registered metric in the text exposition format
pub fn encode_text() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn record_pipeline_built(submitter: &str) {
    PIPELINES_BUILT.with_label_values(&[submitter]).inc();
}

pub fn record_operations_transformed(transformer: &str, chain: &str, count: usize) {
    OPERATIONS_TRANSFORMED
        .with_label_values(&[transformer, chain])
        .inc_by(count as f64);
}

pub fn record_delivery(submitter: &str, chain: &str, success: bool, elapsed: Duration) {
    if success {
        OPERATIONS_DELIVERED
            .with_label_values(&[submitter, chain])
            .inc();
    } else {
        DELIVERY_FAILURES.with_label_values(&[submitter, chain]).inc();
    }
    DELIVERY_LATENCY
        .with_label_values(&[submitter, chain])
        .observe(elapsed.as_secs_f64());
}

pub fn record_precondition_failure(chain: &str) {
    PRECONDITION_FAILURES.with_label_values(&[chain]).inc();
}
