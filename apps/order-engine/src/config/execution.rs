//! Order lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Order lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Capacity of the execution report queue.
    #[serde(default = "default_report_queue_capacity")]
    pub report_queue_capacity: usize,
    /// Reconcile processing orders at startup.
    #[serde(default = "default_reconcile_on_startup")]
    pub reconcile_on_startup: bool,
    /// How long a venue cancel is awaited, in milliseconds.
    #[serde(default = "default_cancel_confirm_timeout_ms")]
    pub cancel_confirm_timeout_ms: u64,
    /// Status poll interval while awaiting a cancel, in milliseconds.
    #[serde(default = "default_cancel_poll_interval_ms")]
    pub cancel_poll_interval_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            report_queue_capacity: default_report_queue_capacity(),
            reconcile_on_startup: default_reconcile_on_startup(),
            cancel_confirm_timeout_ms: default_cancel_confirm_timeout_ms(),
            cancel_poll_interval_ms: default_cancel_poll_interval_ms(),
        }
    }
}

impl ExecutionConfig {
    /// Cancel confirmation timeout.
    #[must_use]
    pub const fn cancel_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.cancel_confirm_timeout_ms)
    }

    /// Cancel poll interval.
    #[must_use]
    pub const fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms)
    }
}

const fn default_report_queue_capacity() -> usize {
    1_024
}

const fn default_reconcile_on_startup() -> bool {
    true
}

const fn default_cancel_confirm_timeout_ms() -> u64 {
    5_000
}

const fn default_cancel_poll_interval_ms() -> u64 {
    200
}
