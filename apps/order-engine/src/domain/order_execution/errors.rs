//! Order lifecycle errors.

use std::fmt;

use super::value_objects::OrderStatus;
use crate::domain::shared::OrderId;

/// Errors raised by order validation and the lifecycle state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Malformed or incomplete order intent.
    Validation {
        /// Offending field.
        field: String,
        /// Error message.
        message: String,
    },

    /// Unsupported option right, order kind, or missing limit price.
    InvalidSpecification {
        /// Error message.
        message: String,
    },

    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Quantity edits are only allowed while pending.
    QuantityLocked {
        /// Order ID.
        order_id: OrderId,
        /// Current status.
        status: OrderStatus,
    },

    /// Reported fill quantities do not add up to the order quantity.
    FillMismatch {
        /// Order ID.
        order_id: OrderId,
        /// Order quantity.
        quantity: u32,
        /// Reported filled quantity.
        filled: u32,
        /// Reported remaining quantity.
        remaining: u32,
    },
}

impl OrderError {
    /// Validation error for a field.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Missing required field.
    #[must_use]
    pub fn missing(field: &str) -> Self {
        Self::validation(field, format!("missing required field '{field}'"))
    }

    /// Invalid specification error.
    #[must_use]
    pub fn invalid_specification(message: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            message: message.into(),
        }
    }
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message, .. } => write!(f, "{message}"),
            Self::InvalidSpecification { message } => {
                write!(f, "Invalid order specification: {message}")
            }
            Self::InvalidStateTransition { from, to, reason } => {
                write!(
                    f,
                    "Invalid order state transition: {from} -> {to}: {reason}"
                )
            }
            Self::QuantityLocked { order_id, status } => {
                write!(
                    f,
                    "Quantity of order {order_id} cannot change while {status}"
                )
            }
            Self::FillMismatch {
                order_id,
                quantity,
                filled,
                remaining,
            } => {
                write!(
                    f,
                    "Fill report for order {order_id} does not balance: filled {filled} + remaining {remaining} != quantity {quantity}"
                )
            }
        }
    }
}

impl std::error::Error for OrderError {}
