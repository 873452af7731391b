//! Order Repository Trait
//!
//! Defines the persistence abstraction for orders.
//! Implemented by adapters in the infrastructure layer.

use async_trait::async_trait;

use super::aggregate::{NewOrder, Order};
use super::claims::OrderClaims;
use super::errors::OrderError;
use super::value_objects::{ExecutionDetails, OrderStatus};
use crate::domain::shared::{OrderId, VenueOrderId};

/// Errors raised by order persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The write violates an order invariant (validation or transition).
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The underlying storage medium failed.
    #[error("Storage failure: {0}")]
    Storage(String),

    /// A stored row could not be decoded.
    #[error("Corrupt order row {id}: {message}")]
    Corrupt {
        /// Row id.
        id: i64,
        /// Decoding error.
        message: String,
    },
}

/// Atomic status write with optional execution details to merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Target status.
    pub status: OrderStatus,
    /// New executed flag; `None` leaves it unchanged.
    pub executed: Option<bool>,
    /// Execution fields to merge; `None` fields are left unchanged.
    pub details: ExecutionDetails,
}

impl StatusUpdate {
    /// Update to the given status.
    #[must_use]
    pub fn to(status: OrderStatus) -> Self {
        Self {
            status,
            executed: None,
            details: ExecutionDetails::default(),
        }
    }

    /// Set the executed flag.
    #[must_use]
    pub const fn executed(mut self, executed: bool) -> Self {
        self.executed = Some(executed);
        self
    }

    /// Merge execution details.
    #[must_use]
    pub fn with_details(mut self, details: ExecutionDetails) -> Self {
        self.details = details;
        self
    }
}

/// Filters for listing orders. All set filters compose with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Match any of these statuses (empty = any).
    pub statuses: Vec<OrderStatus>,
    /// Ticker (case-insensitive).
    pub ticker: Option<String>,
    /// Executed flag.
    pub executed: Option<bool>,
    /// Rollover flag.
    pub is_rollover: Option<bool>,
    /// Maximum number of rows.
    pub limit: Option<u32>,
}

impl OrderFilter {
    /// No filtering.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// The "pending orders" view: orders still in flight, or, with
    /// `executed = true`, orders that have executed.
    #[must_use]
    pub fn pending_view(executed: bool) -> Self {
        if executed {
            Self::default().with_executed(true)
        } else {
            Self::default().with_statuses([OrderStatus::Pending, OrderStatus::Processing])
        }
    }

    /// Match a single status.
    #[must_use]
    pub fn with_status(self, status: OrderStatus) -> Self {
        self.with_statuses([status])
    }

    /// Match any of the given statuses.
    #[must_use]
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Match a ticker.
    #[must_use]
    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into().trim().to_ascii_uppercase());
        self
    }

    /// Match the executed flag.
    #[must_use]
    pub const fn with_executed(mut self, executed: bool) -> Self {
        self.executed = Some(executed);
        self
    }

    /// Match the rollover flag.
    #[must_use]
    pub const fn with_rollover(mut self, is_rollover: bool) -> Self {
        self.is_rollover = Some(is_rollover);
        self
    }

    /// Limit the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check an order against the filter (without the limit).
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && self
                .ticker
                .as_ref()
                .is_none_or(|t| order.ticker.eq_ignore_ascii_case(t))
            && self.executed.is_none_or(|e| order.executed == e)
            && self.is_rollover.is_none_or(|r| order.is_rollover == r)
    }
}

/// Repository trait for Order persistence.
///
/// Absence is never an error: lookups return `None` and mutations return
/// `false` for unknown ids.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Claims shared by every caller of this store. Multi-step mutations of a
    /// `pending` order hold a claim so they cannot interleave.
    fn claims(&self) -> &OrderClaims;

    /// Check the store answers.
    async fn ping(&self) -> bool;

    /// Insert a new `pending` order and return its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid intent, or a storage error.
    async fn create(&self, order: &NewOrder) -> Result<OrderId, StoreError>;

    /// Load an order by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Load an order by its venue order id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn get_by_venue_order_id(
        &self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<Order>, StoreError>;

    /// List orders newest-first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Atomically set status, executed flag and updated_at, merging any
    /// supplied execution details. Returns `false` if the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns an invalid transition error if the current status cannot move
    /// to the requested one, or a storage error.
    async fn update_status(&self, id: OrderId, update: &StatusUpdate) -> Result<bool, StoreError>;

    /// Change the quantity. Returns `false` unless the order exists and is
    /// `pending`.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn update_quantity(&self, id: OrderId, quantity: u32) -> Result<bool, StoreError>;

    /// Hard delete. Returns `false` if the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn delete(&self, id: OrderId) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_view_without_executed_selects_in_flight_statuses() {
        let filter = OrderFilter::pending_view(false);
        assert_eq!(
            filter.statuses,
            vec![OrderStatus::Pending, OrderStatus::Processing]
        );
        assert_eq!(filter.executed, None);
    }

    #[test]
    fn pending_view_with_executed_selects_executed_orders() {
        let filter = OrderFilter::pending_view(true);
        assert!(filter.statuses.is_empty());
        assert_eq!(filter.executed, Some(true));
    }

    #[test]
    fn ticker_filter_is_normalized() {
        let filter = OrderFilter::all().with_ticker(" aapl ");
        assert_eq!(filter.ticker.as_deref(), Some("AAPL"));
    }

    #[test]
    fn status_update_builder() {
        let update = StatusUpdate::to(OrderStatus::Processing).executed(false);
        assert_eq!(update.status, OrderStatus::Processing);
        assert_eq!(update.executed, Some(false));
        assert!(update.details.is_empty());
    }

    #[test]
    fn store_error_wraps_order_error_transparently() {
        let err = StoreError::from(OrderError::missing("ticker"));
        assert_eq!(err.to_string(), "missing required field 'ticker'");
    }
}
