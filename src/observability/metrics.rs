//! # Metrics
//!
//! Prometheus metrics for monitoring the webhook.
//!
//! ## Metrics Exposed
//!
//! - `waf_cert_webhook_admission_reviews_total` - Admission reviews by result (allowed, denied, malformed, skipped)
//! - `waf_cert_webhook_reconciliations_total` - Reconciliations by outcome
//! - `waf_cert_webhook_reconciliation_duration_seconds` - Duration of reconciliations
//! - `waf_cert_webhook_waf_operations_total` - WAF API calls by operation
//! - `waf_cert_webhook_waf_operation_errors_total` - Failed WAF API calls by operation
//! - `waf_cert_webhook_waf_operation_duration_seconds` - Duration of WAF API calls by operation
//! - `waf_cert_webhook_retirement_failures_total` - Superseded certificates that could not be deleted

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static ADMISSION_REVIEWS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "waf_cert_webhook_admission_reviews_total",
            "Total number of admission reviews by result",
        ),
        &["result"],
    )
    .expect("Failed to create ADMISSION_REVIEWS_TOTAL metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "waf_cert_webhook_reconciliations_total",
            "Total number of certificate reconciliations by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "waf_cert_webhook_reconciliation_duration_seconds",
            "Duration of certificate reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static WAF_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "waf_cert_webhook_waf_operations_total",
            "Total number of WAF API operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create WAF_OPERATIONS_TOTAL metric - this should never happen")
});

static WAF_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "waf_cert_webhook_waf_operation_errors_total",
            "Total number of failed WAF API operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create WAF_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static WAF_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "waf_cert_webhook_waf_operation_duration_seconds",
            "Duration of WAF API operations in seconds by operation",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create WAF_OPERATION_DURATION metric - this should never happen")
});

static RETIREMENT_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "waf_cert_webhook_retirement_failures_total",
        "Total number of superseded WAF certificates that could not be deleted",
    )
    .expect("Failed to create RETIREMENT_FAILURES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(ADMISSION_REVIEWS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(WAF_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WAF_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WAF_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(RETIREMENT_FAILURES_TOTAL.clone()))?;

    Ok(())
}

/// Count an admission review; `result` is `allowed`, `denied`, `malformed` or `skipped`
pub fn increment_admission_reviews(result: &str) {
    ADMISSION_REVIEWS_TOTAL.with_label_values(&[result]).inc();
}

pub fn increment_reconciliations(outcome: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn record_waf_operation(operation: &str, duration: f64) {
    WAF_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
    WAF_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_waf_operation_errors(operation: &str) {
    WAF_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn increment_retirement_failures() {
    RETIREMENT_FAILURES_TOTAL.inc();
}
