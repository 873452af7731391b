//! Order status in the lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order_execution::errors::OrderError;

/// Local order status.
///
/// ```text
/// pending ──► processing ──► completed
///    │             │
///    │             └───────► cancelled
///    ├─────────────────────► cancelled
///    └─────────────────────► completed   (mock orders only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Persisted, not yet acknowledged by the venue.
    Pending,
    /// Accepted by the venue (venue order id assigned), awaiting fill.
    Processing,
    /// Fully filled.
    Completed,
    /// Withdrawn before submission or cancelled at the venue.
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns true while the quantity may still be edited.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the order can still be cancelled.
    #[must_use]
    pub const fn is_cancelable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Returns true if the venue holds a live order for this status.
    #[must_use]
    pub const fn is_working(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(OrderError::validation(
                "status",
                format!("unknown order status '{other}'"),
            )),
        }
    }
}
