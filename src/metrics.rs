//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `terminal_operator_reconciliations_total` - Reconciliations per kind
//! - `terminal_operator_reconciliation_errors_total` - Reconciliation errors per kind
//! - `terminal_operator_reconcile_duration_seconds` - Reconcile duration per kind
//! - `terminal_operator_api_operations_total` - Terminal API calls per operation
//! - `terminal_operator_api_operation_errors_total` - Terminal API errors per operation
//! - `terminal_operator_api_operation_duration_seconds` - Terminal API call duration
//! - `terminal_operator_drift_polls_total` - External state polls for orders
//! - `terminal_operator_external_cleanups_total` - Remote delete attempts per kind

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "terminal_operator_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "terminal_operator_reconciliation_errors_total",
            "Total number of reconciliation errors by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "terminal_operator_reconcile_duration_seconds",
            "Duration of reconciliation in seconds by resource kind",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILE_DURATION metric - this should never happen")
});

static API_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "terminal_operator_api_operations_total",
            "Total number of Terminal API operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create API_OPERATIONS_TOTAL metric - this should never happen")
});

static API_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "terminal_operator_api_operation_errors_total",
            "Total number of Terminal API operation errors by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create API_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static API_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "terminal_operator_api_operation_duration_seconds",
            "Duration of Terminal API operations in seconds by operation",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create API_OPERATION_DURATION metric - this should never happen")
});

static DRIFT_POLLS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "terminal_operator_drift_polls_total",
        "Total number of external state polls for non-terminal orders",
    )
    .expect("Failed to create DRIFT_POLLS_TOTAL metric - this should never happen")
});

static EXTERNAL_CLEANUPS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "terminal_operator_external_cleanups_total",
            "Total number of remote delete attempts issued on resource removal",
        ),
        &["kind"],
    )
    .expect("Failed to create EXTERNAL_CLEANUPS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Registration only fails on duplicate metric names"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_DURATION.clone()))?;
    REGISTRY.register(Box::new(API_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(DRIFT_POLLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EXTERNAL_CLEANUPS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconcile_duration(kind: &str, duration: f64) {
    RECONCILE_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_api_operations(operation: &str) {
    API_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_api_operation_errors(operation: &str) {
    API_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn observe_api_operation_duration(operation: &str, duration: f64) {
    API_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_drift_polls() {
    DRIFT_POLLS_TOTAL.inc();
}

pub fn increment_external_cleanups(kind: &str) {
    EXTERNAL_CLEANUPS_TOTAL.with_label_values(&[kind]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.with_label_values(&["Order"]).get();
        increment_reconciliations("Order");
        let after = RECONCILIATIONS_TOTAL.with_label_values(&["Order"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Card"])
            .get();
        increment_reconciliation_errors("Card");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Card"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconcile_duration() {
        observe_reconcile_duration("Profile", 1.5);
        // Histogram observation does not return a value; just verify no panic.
    }

    #[test]
    fn test_api_operation_metrics() {
        let before = API_OPERATIONS_TOTAL
            .with_label_values(&["order.create"])
            .get();
        increment_api_operations("order.create");
        observe_api_operation_duration("order.create", 0.3);
        let after = API_OPERATIONS_TOTAL
            .with_label_values(&["order.create"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_drift_polls() {
        let before = DRIFT_POLLS_TOTAL.get();
        increment_drift_polls();
        assert_eq!(DRIFT_POLLS_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_increment_external_cleanups() {
        let before = EXTERNAL_CLEANUPS_TOTAL.with_label_values(&["Token"]).get();
        increment_external_cleanups("Token");
        let after = EXTERNAL_CLEANUPS_TOTAL.with_label_values(&["Token"]).get();
        assert_eq!(after, before + 1u64);
    }
}
