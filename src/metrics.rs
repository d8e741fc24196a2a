//! Prometheus metrics for the mutation pipeline.
//!
//! Metrics are exposed via a dedicated HTTP listener (`METRICS_PORT`, default
//! 9090, `0` disables it).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `board_quota_decisions_total` - Gate decisions (labels: operation, decision)
//! - `board_identity_resolutions_total` - Caller resolutions (labels: outcome)
//! - `board_mutations_total` - Writes attempted (labels: record, action, outcome)
//!
//! ## Gauges
//! - `board_records` - Records currently stored (labels: record)
//!
//! Recording functions are safe to call before (or without) `init_metrics`;
//! the `metrics` facade drops samples when no recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

use crate::quota::Operation;
use crate::store::RecordKind;

/// Metric names as constants for consistency.
pub mod names {
    pub const QUOTA_DECISIONS_TOTAL: &str = "board_quota_decisions_total";
    pub const IDENTITY_RESOLUTIONS_TOTAL: &str = "board_identity_resolutions_total";
    pub const MUTATIONS_TOTAL: &str = "board_mutations_total";
    pub const RECORDS: &str = "board_records";
}

/// Install the Prometheus exporter and describe all metrics.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::QUOTA_DECISIONS_TOTAL,
        "Quota gate decisions by operation (admitted or rejected)"
    );
    describe_counter!(
        names::IDENTITY_RESOLUTIONS_TOTAL,
        "Caller identity resolutions by outcome"
    );
    describe_counter!(
        names::MUTATIONS_TOTAL,
        "Write attempts by record kind, action and outcome"
    );
    describe_gauge!(names::RECORDS, "Records currently held in the store");

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_quota_decision(operation: Operation, admitted: bool) {
    let decision = if admitted { "admitted" } else { "rejected" };
    counter!(names::QUOTA_DECISIONS_TOTAL, "operation" => operation.name(), "decision" => decision)
        .increment(1);
}

pub fn record_identity_resolution(outcome: &'static str) {
    counter!(names::IDENTITY_RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_mutation(record: RecordKind, action: &'static str, outcome: &'static str) {
    counter!(names::MUTATIONS_TOTAL, "record" => record.as_str(), "action" => action, "outcome" => outcome)
        .increment(1);
}

pub fn set_record_count(record: RecordKind, count: usize) {
    gauge!(names::RECORDS, "record" => record.as_str()).set(count as f64);
}
