//! Metrics definitions for the reconciler.
//!
//! This module defines all metrics used throughout the engine.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "events_processed_total",
        "Total number of ledger events reconciled"
    );
    describe_counter!(
        "events_skipped_total",
        "Total number of events skipped by the no-op guards"
    );
    describe_counter!(
        "ledger_anomalies_total",
        "Total number of inconsistent-state anomalies (logged and skipped)"
    );
    describe_counter!(
        "external_read_reverts_total",
        "Total number of reverted token-contract reads"
    );
    describe_counter!(
        "vaults_provisioned_total",
        "Total number of vault records created by the provisioning rule"
    );
    describe_counter!(
        "provisioning_reverts_total",
        "Total number of provisioning attempts abandoned on a reverted address computation"
    );
    describe_histogram!(
        "event_processing_duration_seconds",
        "Time taken to reconcile one event in seconds"
    );
}

/// Record a reconciled event.
pub fn record_event_processed(kind: &str) {
    counter!("events_processed_total", "kind" => kind.to_string()).increment(1);
}

/// Record an event skipped by a guard.
///
/// # Arguments
/// * `reason` - The guard that fired ("self_transfer" or "zero_value")
pub fn record_event_skipped(reason: &str) {
    counter!("events_skipped_total", "reason" => reason.to_string()).increment(1);
}

/// Record an inconsistent-state anomaly.
///
/// # Arguments
/// * `kind` - The anomaly class (e.g. "missing_balance", "underflow")
pub fn record_anomaly(kind: &str) {
    counter!("ledger_anomalies_total", "kind" => kind.to_string()).increment(1);
}

/// Record a reverted external read.
///
/// # Arguments
/// * `attribute` - The queried attribute ("name", "symbol", ...)
pub fn record_read_revert(attribute: &str) {
    counter!("external_read_reverts_total", "attribute" => attribute.to_string()).increment(1);
}

/// Record a provisioned vault.
pub fn record_vault_provisioned() {
    counter!("vaults_provisioned_total").increment(1);
}

/// Record a provisioning attempt abandoned on revert.
pub fn record_provisioning_revert() {
    counter!("provisioning_reverts_total").increment(1);
}

/// Record event processing duration.
pub fn record_event_processing_duration(duration_secs: f64) {
    histogram!("event_processing_duration_seconds").record(duration_secs);
}

/// A timer that automatically records duration when dropped.
pub struct ProcessingTimer {
    start: Instant,
}

impl ProcessingTimer {
    /// Start a new processing timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for ProcessingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_event_processing_duration(duration);
    }
}
