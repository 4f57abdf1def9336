//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `external_secrets_reconciliations_total` - Total number of reconciliations
//! - `external_secrets_reconciliation_errors_total{reason}` - Failed reconciliations by condition reason
//! - `external_secrets_reconciliation_duration_seconds` - Duration of reconciliation operations
//! - `external_secrets_secrets_applied_total` - Generated Secrets written to the cluster
//! - `external_secrets_provider_operations_total{provider,operation}` - Backend calls
//! - `external_secrets_provider_operation_duration_seconds{provider}` - Duration of backend calls
//! - `external_secrets_provider_operation_errors_total{provider}` - Failed backend calls
//! - `external_secrets_status_update_failures_total` - Status writes that were dropped

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "external_secrets_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_reconciliation_errors_total",
            "Total number of reconciliation errors by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "external_secrets_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SECRETS_APPLIED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "external_secrets_secrets_applied_total",
        "Total number of generated Secrets applied to the cluster",
    )
    .expect("Failed to create SECRETS_APPLIED_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_provider_operations_total",
            "Total number of provider operations by provider and operation",
        ),
        &["provider", "operation"],
    )
    .expect("Failed to create PROVIDER_OPERATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "external_secrets_provider_operation_duration_seconds",
            "Duration of provider operations in seconds by provider type",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_OPERATION_DURATION metric - this should never happen")
});

static PROVIDER_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "external_secrets_provider_operation_errors_total",
            "Total number of provider operation errors by provider type",
        ),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static STATUS_UPDATE_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "external_secrets_status_update_failures_total",
        "Total number of status updates that failed and were dropped",
    )
    .expect("Failed to create STATUS_UPDATE_FAILURES_TOTAL metric - this should never happen")
});

/// Register all metrics with the global registry. Call once at startup.
///
/// # Errors
///
/// Fails if a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRETS_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_UPDATE_FAILURES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(reason: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_secrets_applied() {
    SECRETS_APPLIED_TOTAL.inc();
}

pub fn record_provider_operation(provider: &str, operation: &str, duration: f64) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[provider, operation])
        .inc();
    PROVIDER_OPERATION_DURATION
        .with_label_values(&[provider])
        .observe(duration);
}

pub fn increment_provider_operation_errors(provider: &str) {
    PROVIDER_OPERATION_ERRORS_TOTAL
        .with_label_values(&[provider])
        .inc();
}

pub fn increment_status_update_failures() {
    STATUS_UPDATE_FAILURES_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_counters_track_per_label() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["StoreNotFound"])
            .get();
        increment_reconciliation_errors("StoreNotFound");
        assert_eq!(
            RECONCILIATION_ERRORS_TOTAL
                .with_label_values(&["StoreNotFound"])
                .get(),
            before + 1
        );
    }

    #[test]
    fn test_provider_operation_records_count_and_duration() {
        let before = PROVIDER_OPERATIONS_TOTAL
            .with_label_values(&["vault", "get_secret"])
            .get();
        record_provider_operation("vault", "get_secret", 0.2);
        assert_eq!(
            PROVIDER_OPERATIONS_TOTAL
                .with_label_values(&["vault", "get_secret"])
                .get(),
            before + 1
        );
        assert!(
            PROVIDER_OPERATION_DURATION
                .with_label_values(&["vault"])
                .get_sample_count()
                >= 1
        );
    }
}
