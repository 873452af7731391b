//! Execution reports and the execution details they carry onto an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::domain::shared::VenueOrderId;

/// Venue-side state of an order, classified from the venue status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueOrderState {
    /// Accepted and working (possibly partially filled).
    Working,
    /// Fully filled.
    Filled,
    /// Cancelled, expired, or rejected at the venue.
    Cancelled,
}

impl VenueOrderState {
    /// Classify a venue status string.
    ///
    /// Unknown strings are treated as working so the order is never
    /// terminated on a status the engine does not understand.
    #[must_use]
    pub fn classify(venue_status: &str) -> Self {
        match venue_status.trim().to_ascii_lowercase().as_str() {
            "filled" => Self::Filled,
            "cancelled" | "canceled" | "apicancelled" | "inactive" | "expired" | "rejected" => {
                Self::Cancelled
            }
            _ => Self::Working,
        }
    }

    /// Local status this venue state maps to.
    #[must_use]
    pub const fn local_status(&self) -> OrderStatus {
        match self {
            Self::Working => OrderStatus::Processing,
            Self::Filled => OrderStatus::Completed,
            Self::Cancelled => OrderStatus::Cancelled,
        }
    }
}

/// Structured execution report delivered by the broker session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Venue order the report refers to.
    pub venue_order_id: VenueOrderId,
    /// Raw venue status string (e.g. "Submitted", "Filled").
    pub venue_status: String,
    /// Cumulative filled quantity.
    pub filled: u32,
    /// Quantity still working.
    pub remaining: u32,
    /// Average fill price across all fills.
    pub avg_fill_price: Option<Decimal>,
}

impl ExecutionReport {
    /// Create a new execution report.
    #[must_use]
    pub fn new(
        venue_order_id: VenueOrderId,
        venue_status: impl Into<String>,
        filled: u32,
        remaining: u32,
    ) -> Self {
        Self {
            venue_order_id,
            venue_status: venue_status.into(),
            filled,
            remaining,
            avg_fill_price: None,
        }
    }

    /// Add the average fill price.
    #[must_use]
    pub const fn with_avg_fill_price(mut self, price: Decimal) -> Self {
        self.avg_fill_price = Some(price);
        self
    }

    /// Classified venue state.
    #[must_use]
    pub fn state(&self) -> VenueOrderState {
        VenueOrderState::classify(&self.venue_status)
    }

    /// Execution details to merge onto the stored order.
    #[must_use]
    pub fn details(&self) -> ExecutionDetails {
        ExecutionDetails {
            venue_order_id: None,
            venue_status: Some(self.venue_status.clone()),
            filled: Some(self.filled),
            remaining: Some(self.remaining),
            avg_fill_price: self.avg_fill_price,
        }
    }
}

/// Execution fields of an order. `None` means "leave unchanged" when merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDetails {
    /// Venue order identifier.
    pub venue_order_id: Option<VenueOrderId>,
    /// Venue status string.
    pub venue_status: Option<String>,
    /// Filled quantity.
    pub filled: Option<u32>,
    /// Remaining quantity.
    pub remaining: Option<u32>,
    /// Average fill price.
    pub avg_fill_price: Option<Decimal>,
}

impl ExecutionDetails {
    /// Details recorded when the venue accepts a submission.
    #[must_use]
    pub fn accepted(venue_order_id: VenueOrderId, venue_status: String, quantity: u32) -> Self {
        Self {
            venue_order_id: Some(venue_order_id),
            venue_status: Some(venue_status),
            filled: Some(0),
            remaining: Some(quantity),
            avg_fill_price: None,
        }
    }

    /// Returns true if nothing would be merged.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.venue_order_id.is_none()
            && self.venue_status.is_none()
            && self.filled.is_none()
            && self.remaining.is_none()
            && self.avg_fill_price.is_none()
    }

    /// Merge `other` on top of `self`, last write wins per field.
    #[must_use]
    pub fn merged(mut self, other: &Self) -> Self {
        if other.venue_order_id.is_some() {
            self.venue_order_id.clone_from(&other.venue_order_id);
        }
        if other.venue_status.is_some() {
            self.venue_status.clone_from(&other.venue_status);
        }
        if other.filled.is_some() {
            self.filled = other.filled;
        }
        if other.remaining.is_some() {
            self.remaining = other.remaining;
        }
        if other.avg_fill_price.is_some() {
            self.avg_fill_price = other.avg_fill_price;
        }
        self
    }
}
