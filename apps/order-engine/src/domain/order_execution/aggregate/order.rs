//! Order Aggregate Root
//!
//! An order is persisted as a single row; every execution-state change goes
//! through [`StatusUpdate`] so the store can apply it atomically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::repository::StatusUpdate;
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{
    ExecutionDetails, ExecutionReport, Instrument, MarketSnapshot, OrderSide, OrderStatus,
    OrderType, VenueOrderState,
};
use crate::domain::shared::OrderId;

/// Venue status recorded on synthetic fills of mock orders.
pub const MOCK_FILL_STATUS: &str = "MockFilled";

/// A validated order intent, ready to be persisted as `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    /// Underlying ticker (upper case).
    pub ticker: String,
    /// Instrument traded.
    pub instrument: Instrument,
    /// Buy or sell.
    pub action: OrderSide,
    /// Contracts or shares (positive).
    pub quantity: u32,
    /// Requested premium / limit price; `None` means a market order.
    pub premium: Option<Decimal>,
    /// Quote and Greeks at creation.
    pub snapshot: MarketSnapshot,
    /// Rehearsal order that never reaches the venue.
    pub is_mock: bool,
    /// Part of a rollover pair.
    pub is_rollover: bool,
    /// Prior order this one rolls.
    pub rolled_from: Option<OrderId>,
}

impl NewOrder {
    /// Create an option order intent with no snapshot and no flags.
    #[must_use]
    pub fn new(
        ticker: impl Into<String>,
        instrument: Instrument,
        action: OrderSide,
        quantity: u32,
        premium: Option<Decimal>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            instrument,
            action,
            quantity,
            premium,
            snapshot: MarketSnapshot::default(),
            is_mock: false,
            is_rollover: false,
            rolled_from: None,
        }
    }

    /// Attach a market snapshot.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: MarketSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Flag as a mock order.
    #[must_use]
    pub const fn mock(mut self) -> Self {
        self.is_mock = true;
        self
    }

    /// Flag as the replacement leg of a rollover.
    #[must_use]
    pub const fn rolling(mut self, prior: OrderId) -> Self {
        self.is_rollover = true;
        self.rolled_from = Some(prior);
        self
    }

    /// Validate the invariants a stored order must satisfy.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty ticker, zero quantity,
    /// non-positive strike, or negative premium.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.ticker.trim().is_empty() {
            return Err(OrderError::missing("ticker"));
        }
        if self.quantity == 0 {
            return Err(OrderError::validation(
                "quantity",
                "quantity must be a positive integer",
            ));
        }
        if let Some(strike) = self.instrument.strike()
            && strike <= Decimal::ZERO
        {
            return Err(OrderError::validation("strike", "strike must be positive"));
        }
        if let Some(premium) = self.premium
            && premium < Decimal::ZERO
        {
            return Err(OrderError::validation(
                "premium",
                "premium must not be negative",
            ));
        }
        Ok(())
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Local id.
    pub id: OrderId,
    /// Underlying ticker.
    pub ticker: String,
    /// Instrument traded.
    pub instrument: Instrument,
    /// Buy or sell.
    pub action: OrderSide,
    /// Contracts or shares.
    pub quantity: u32,
    /// Requested premium / limit price.
    pub premium: Option<Decimal>,
    /// Quote and Greeks at creation.
    pub snapshot: MarketSnapshot,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// True once any quantity has executed.
    pub executed: bool,
    /// Venue-side execution fields.
    pub execution: ExecutionDetails,
    /// Rehearsal order.
    pub is_mock: bool,
    /// Part of a rollover pair.
    pub is_rollover: bool,
    /// Prior order this one rolls.
    pub rolled_from: Option<OrderId>,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Order type implied by the intent: limit at the premium, or market.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        if self.premium.is_some() {
            OrderType::Limit
        } else {
            OrderType::Market
        }
    }

    /// Ensure the order can be submitted.
    ///
    /// # Errors
    ///
    /// Returns an invalid transition unless the order is `pending`.
    pub fn ensure_submittable(&self) -> Result<(), OrderError> {
        if self.status == OrderStatus::Pending {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Processing,
                reason: format!("only pending orders can be executed, order is {}", self.status),
            })
        }
    }

    /// Synthetic fill at the requested premium for a mock order.
    #[must_use]
    pub fn mock_fill(&self) -> StatusUpdate {
        StatusUpdate::to(OrderStatus::Completed)
            .executed(true)
            .with_details(ExecutionDetails {
                venue_order_id: None,
                venue_status: Some(MOCK_FILL_STATUS.to_string()),
                filled: Some(self.quantity),
                remaining: Some(0),
                avg_fill_price: self.premium,
            })
    }

    /// Translate a venue execution report into a status update.
    ///
    /// A partial fill followed by a cancel stays `cancelled` with `executed`
    /// reflecting the partial fill.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::FillMismatch`] when the report's quantities do
    /// not add up to the order quantity, and an invalid transition when the
    /// order cannot move to the reported state.
    pub fn apply_report(&self, report: &ExecutionReport) -> Result<StatusUpdate, OrderError> {
        let state = report.state();
        let balanced = u64::from(report.filled) + u64::from(report.remaining)
            == u64::from(self.quantity);
        let fully_filled = report.filled == self.quantity;

        if !balanced || (state == VenueOrderState::Filled && !fully_filled) {
            return Err(OrderError::FillMismatch {
                order_id: self.id,
                quantity: self.quantity,
                filled: report.filled,
                remaining: report.remaining,
            });
        }

        let status = state.local_status();
        OrderStateMachine::validate_transition(self.status, status)?;

        let executed = match state {
            VenueOrderState::Filled => true,
            VenueOrderState::Working | VenueOrderState::Cancelled => report.filled > 0,
        };

        Ok(StatusUpdate::to(status)
            .executed(executed)
            .with_details(report.details()))
    }
}
