//! Prometheus metrics for the order engine.
//!
//! Covers order creation and submission, execution report handling, broker
//! session health, and quote retrieval.
//!
//! # Example
//!
//! ```ignore
//! use order_engine::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config)?;
//!
//! // Record an order submission
//! record_order_submission("submitted", "LMT", 0.015);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // Latency buckets from 1ms to 30s; venue round trips are slow
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Lifecycle Metrics
// ============================================================================

/// Record a newly stored order.
///
/// # Arguments
///
/// * `kind` - Instrument kind (e.g., "OPTION", "EQUITY")
/// * `mock` - Whether the order is a rehearsal order
pub fn record_order_created(kind: &str, mock: bool) {
    counter!(
        "orders_created_total",
        "kind" => kind.to_string(),
        "mock" => mock.to_string()
    )
    .increment(1);
}

/// Record an order submission.
///
/// # Arguments
///
/// * `status` - Submission outcome (e.g., "submitted", "mock_filled", "not_connected", "rejected")
/// * `order_type` - Venue order type code (e.g., "MKT", "LMT")
/// * `latency_seconds` - Time from execute request to outcome in seconds
pub fn record_order_submission(status: &str, order_type: &str, latency_seconds: f64) {
    counter!(
        "order_submissions_total",
        "status" => status.to_string(),
        "order_type" => order_type.to_string()
    )
    .increment(1);

    histogram!(
        "order_submission_latency_seconds",
        "order_type" => order_type.to_string()
    )
    .record(latency_seconds);
}

/// Record a cancel request.
///
/// # Arguments
///
/// * `outcome` - "local", "confirmed", "requested" or "failed"
pub fn record_order_cancel(outcome: &str) {
    counter!(
        "order_cancels_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a rollover attempt.
///
/// # Arguments
///
/// * `outcome` - "completed", "partial" or "failed"
pub fn record_rollover(outcome: &str) {
    counter!(
        "order_rollovers_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record handling of an execution report.
///
/// # Arguments
///
/// * `outcome` - "applied", "discarded" or "error"
pub fn record_execution_report(outcome: &str) {
    counter!(
        "execution_reports_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a reconciliation pass.
///
/// # Arguments
///
/// * `checked` - Orders queried at the venue
/// * `applied` - Reports that changed local state
/// * `failed` - Orders that could not be queried
pub fn record_reconciliation(checked: usize, applied: usize, failed: usize) {
    counter!("reconciliation_runs_total").increment(1);
    counter!("reconciliation_orders_checked_total").increment(checked as u64);
    counter!("reconciliation_reports_applied_total").increment(applied as u64);
    counter!("reconciliation_failures_total").increment(failed as u64);
}

// ============================================================================
// Broker Session Metrics
// ============================================================================

/// Update the session connectivity gauge.
///
/// # Arguments
///
/// * `connected` - Whether the broker session is live
pub fn record_session_state(connected: bool) {
    gauge!("broker_session_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Record a reconnect attempt by the session supervisor.
///
/// # Arguments
///
/// * `outcome` - "success" or "failure"
pub fn record_reconnect_attempt(outcome: &str) {
    counter!(
        "broker_reconnect_attempts_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record where a price came from.
///
/// # Arguments
///
/// * `source` - "live", "close", "cache" or "unavailable"
pub fn record_quote_source(source: &str) {
    counter!(
        "price_requests_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// Update the open live-quote subscription gauge.
///
/// # Arguments
///
/// * `count` - Subscriptions currently held
pub fn update_open_subscriptions(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("quote_subscriptions_open").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_listens_on_9090() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn recording_without_exporter_is_a_noop() {
        record_order_created("OPTION", false);
        record_order_submission("submitted", "LMT", 0.01);
        record_execution_report("applied");
        record_session_state(true);
        record_quote_source("cache");
        update_open_subscriptions(0);
    }
}
