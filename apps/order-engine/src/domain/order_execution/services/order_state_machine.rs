//! Order State Machine Service
//!
//! Validates lifecycle transitions for stored orders.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
///
/// Same-status writes are accepted so that execution details can be merged
/// onto an order without moving it (progress reports, idempotent re-apply).
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        from == to
            || matches!(
                (from, to),
                // From Pending
                (OrderStatus::Pending, OrderStatus::Processing)
                    | (OrderStatus::Pending, OrderStatus::Cancelled)
                    // Mock orders complete without a venue round trip
                    | (OrderStatus::Pending, OrderStatus::Completed)
                    // From Processing
                    | (OrderStatus::Processing, OrderStatus::Completed)
                    | (OrderStatus::Processing, OrderStatus::Cancelled)
            )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Completed => format!("Order is already completed, cannot transition to {to}"),
            OrderStatus::Cancelled => format!("Order is cancelled, cannot transition to {to}"),
            OrderStatus::Processing => {
                format!("Order is working at the venue, cannot transition to {to}")
            }
            OrderStatus::Pending => format!("Invalid transition from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state (excluding itself).
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::Pending => vec![
                OrderStatus::Processing,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Processing => vec![OrderStatus::Completed, OrderStatus::Cancelled],
            // Terminal states
            OrderStatus::Completed | OrderStatus::Cancelled => vec![],
        }
    }

    /// All statuses from which `to` may be written, including `to` itself.
    ///
    /// Stores use this to make the status check part of the same atomic
    /// write as the update.
    #[must_use]
    pub fn allowed_sources(to: OrderStatus) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|from| Self::is_valid_transition(*from, to))
            .collect()
    }
}
