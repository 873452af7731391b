//! Observability module for metrics and logging.
//!
//! This module provides instrumentation for the order engine:
//! Prometheus metrics export and the tracing subscriber setup.

mod logging;
mod metrics;

pub use self::metrics::{
    MetricsConfig, MetricsError, init_metrics, record_execution_report, record_order_cancel,
    record_order_created, record_order_submission, record_quote_source, record_reconciliation,
    record_reconnect_attempt, record_rollover, record_session_state, update_open_subscriptions,
};
pub use self::logging::{LoggingError, init_tracing};
