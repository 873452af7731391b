//! Lifecycle errors surfaced by use cases.

use crate::application::ports::BrokerError;
use crate::domain::order_execution::{OrderError, StoreError};
use crate::domain::shared::OrderId;

/// Error returned by order lifecycle use cases.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Malformed or incomplete request.
    #[error("{message}")]
    Validation {
        /// Offending field, when known.
        field: Option<String>,
        /// Error message.
        message: String,
    },

    /// Referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Requested id.
        id: String,
    },

    /// No broker session.
    #[error("Not connected to broker")]
    NotConnected,

    /// The order cannot be expressed at the venue.
    #[error("Invalid order specification: {message}")]
    InvalidSpecification {
        /// Error details.
        message: String,
    },

    /// The venue refused or failed the request.
    #[error("{message}")]
    VenueFailure {
        /// Venue message, verbatim.
        message: String,
    },

    /// The order's current state forbids the operation.
    #[error("{message}")]
    Conflict {
        /// Error details.
        message: String,
    },

    /// The prior order was cancelled but its replacement was not created.
    #[error("Rollover of order {prior_order_id} cancelled the prior order but failed to create the replacement: {reason}")]
    PartialRollover {
        /// Order that was cancelled.
        prior_order_id: OrderId,
        /// Why the replacement failed.
        reason: String,
    },

    /// The store failed.
    #[error("Storage failure: {message}")]
    Storage {
        /// Error details.
        message: String,
    },
}

impl LifecycleError {
    /// Validation error on a field.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Order not found.
    #[must_use]
    pub fn order_not_found(id: OrderId) -> Self {
        Self::NotFound {
            entity: "Order",
            id: id.to_string(),
        }
    }

    /// State conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

impl From<OrderError> for LifecycleError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation { field, message } => Self::Validation {
                field: Some(field),
                message,
            },
            OrderError::InvalidSpecification { message } => Self::InvalidSpecification { message },
            OrderError::InvalidStateTransition { .. } | OrderError::QuantityLocked { .. } => {
                Self::Conflict {
                    message: err.to_string(),
                }
            }
            OrderError::FillMismatch { .. } => Self::VenueFailure {
                message: err.to_string(),
            },
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Order(order) => order.into(),
            StoreError::Storage(_) | StoreError::Corrupt { .. } => Self::Storage {
                message: err.to_string(),
            },
        }
    }
}

impl From<BrokerError> for LifecycleError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::NotConnected => Self::NotConnected,
            BrokerError::InvalidSpecification { message } => Self::InvalidSpecification { message },
            BrokerError::VenueRejected { message } => Self::VenueFailure { message },
            BrokerError::Timeout { .. } | BrokerError::Transport { .. } => Self::VenueFailure {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::OrderStatus;

    #[test]
    fn transition_errors_become_conflicts() {
        let err: LifecycleError = OrderError::InvalidStateTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Processing,
            reason: "terminal".into(),
        }
        .into();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
    }

    #[test]
    fn store_order_errors_unwrap_to_domain_mapping() {
        let err: LifecycleError = StoreError::Order(OrderError::missing("ticker")).into();
        assert_eq!(
            err,
            LifecycleError::Validation {
                field: Some("ticker".into()),
                message: "missing required field 'ticker'".into(),
            }
        );
    }

    #[test]
    fn venue_rejection_message_is_verbatim() {
        let err: LifecycleError = BrokerError::rejected("No trading permissions").into();
        assert_eq!(err.to_string(), "No trading permissions");
    }

    #[test]
    fn not_connected_passes_through() {
        let err: LifecycleError = BrokerError::NotConnected.into();
        assert_eq!(err, LifecycleError::NotConnected);
    }
}
