//! Broker Session Port (Driven Port)
//!
//! The narrow contract the lifecycle controller needs from a stateful venue
//! connection. Wire-protocol details live behind implementations.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::order_execution::value_objects::{
    ExecutionReport, Instrument, OrderSide, OrderType,
};
use crate::domain::order_execution::{Order, OrderError};
use crate::domain::shared::VenueOrderId;

/// A venue-qualified contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    /// Venue contract id.
    pub con_id: i64,
    /// Underlying ticker.
    pub ticker: String,
    /// Instrument the contract represents.
    pub instrument: Instrument,
    /// Venue symbol (OCC-style for options).
    pub local_symbol: String,
}

/// An order specification ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Buy or sell.
    pub action: OrderSide,
    /// Total quantity.
    pub quantity: u32,
    /// Market or limit.
    pub order_type: OrderType,
    /// Limit price for limit orders.
    pub limit_price: Option<Decimal>,
}

impl OrderSpec {
    /// Build a spec, checking the price against the order kind.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidSpecification`] for a zero quantity, a
    /// market order with a price, or a limit order without a positive price.
    pub fn build(
        action: OrderSide,
        quantity: u32,
        order_type: OrderType,
        limit_price: Option<Decimal>,
    ) -> Result<Self, BrokerError> {
        if quantity == 0 {
            return Err(BrokerError::invalid_specification(
                "quantity must be positive",
            ));
        }
        match (order_type, limit_price) {
            (OrderType::Market, Some(_)) => Err(BrokerError::invalid_specification(
                "market orders take no limit price",
            )),
            (OrderType::Limit, None) => Err(BrokerError::invalid_specification(
                "limit orders require a limit price",
            )),
            (OrderType::Limit, Some(price)) if price <= Decimal::ZERO => Err(
                BrokerError::invalid_specification("limit price must be positive"),
            ),
            _ => Ok(Self {
                action,
                quantity,
                order_type,
                limit_price,
            }),
        }
    }

    /// Market order.
    ///
    /// # Errors
    ///
    /// Returns error for a zero quantity.
    pub fn market(action: OrderSide, quantity: u32) -> Result<Self, BrokerError> {
        Self::build(action, quantity, OrderType::Market, None)
    }

    /// Limit order.
    ///
    /// # Errors
    ///
    /// Returns error for a zero quantity or non-positive price.
    pub fn limit(action: OrderSide, quantity: u32, price: Decimal) -> Result<Self, BrokerError> {
        Self::build(action, quantity, OrderType::Limit, Some(price))
    }

    /// Spec implied by a stored order.
    ///
    /// # Errors
    ///
    /// Same as [`OrderSpec::build`].
    pub fn for_order(order: &Order) -> Result<Self, BrokerError> {
        let order_type = order.order_type();
        let limit_price = if order_type.requires_price() {
            order.premium
        } else {
            None
        };
        Self::build(order.action, order.quantity, order_type, limit_price)
    }
}

/// Venue acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueHandle {
    /// Venue-assigned order id.
    pub venue_order_id: VenueOrderId,
    /// Venue status at acknowledgement (e.g. "Submitted").
    pub venue_status: String,
}

/// Market data type requested from the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketDataMode {
    /// Real-time streaming.
    #[default]
    Live,
    /// Last quote at close.
    Frozen,
    /// Delayed quotes.
    Delayed,
}

impl MarketDataMode {
    /// Venue numeric code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Live => 1,
            Self::Frozen => 2,
            Self::Delayed => 3,
        }
    }
}

impl fmt::Display for MarketDataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Frozen => "frozen",
            Self::Delayed => "delayed",
        })
    }
}

impl FromStr for MarketDataMode {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" | "1" => Ok(Self::Live),
            "frozen" | "2" => Ok(Self::Frozen),
            "delayed" | "3" => Ok(Self::Delayed),
            other => Err(BrokerError::invalid_specification(format!(
                "unknown market data mode '{other}'"
            ))),
        }
    }
}

/// Broker session error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// No live session.
    #[error("Not connected to broker")]
    NotConnected,

    /// The order or contract cannot be expressed at the venue.
    #[error("Invalid order specification: {message}")]
    InvalidSpecification {
        /// Error details.
        message: String,
    },

    /// The venue refused the request.
    #[error("{message}")]
    VenueRejected {
        /// Venue message, verbatim.
        message: String,
    },

    /// A venue call did not complete in time.
    #[error("Broker {operation} timed out")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// The connection failed mid-call.
    #[error("Broker transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },
}

impl BrokerError {
    /// Invalid specification error.
    #[must_use]
    pub fn invalid_specification(message: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            message: message.into(),
        }
    }

    /// Venue rejection with the venue's message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::VenueRejected {
            message: message.into(),
        }
    }

    /// Timeout of the named operation.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }
}

impl From<OrderError> for BrokerError {
    fn from(err: OrderError) -> Self {
        Self::invalid_specification(err.to_string())
    }
}

/// Port for a stateful broker session.
///
/// Implementations serialize venue calls internally and bound every call
/// with a timeout.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Connect if not connected. Idempotent; returns the resulting state.
    async fn connect(&self) -> bool;

    /// Disconnect. Idempotent.
    async fn disconnect(&self);

    /// Whether a live session exists.
    fn is_connected(&self) -> bool;

    /// Qualify a contract at the venue. `Ok(None)` when the venue knows no
    /// such contract.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` without a session, or a transport error.
    async fn resolve_contract(
        &self,
        ticker: &str,
        instrument: &Instrument,
    ) -> Result<Option<Contract>, BrokerError>;

    /// Build an order specification.
    ///
    /// # Errors
    ///
    /// See [`OrderSpec::build`].
    fn build_order(
        &self,
        action: OrderSide,
        quantity: u32,
        order_type: OrderType,
        limit_price: Option<Decimal>,
    ) -> Result<OrderSpec, BrokerError> {
        OrderSpec::build(action, quantity, order_type, limit_price)
    }

    /// Submit an order.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, a venue rejection, or a timeout.
    async fn submit(&self, contract: &Contract, spec: &OrderSpec)
    -> Result<VenueHandle, BrokerError>;

    /// Request cancellation of a working venue order.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, a venue rejection, or a timeout.
    async fn cancel(&self, venue_order_id: &VenueOrderId) -> Result<(), BrokerError>;

    /// Best available price, or `None` when unavailable.
    async fn get_price(&self, ticker: &str) -> Option<Decimal>;

    /// Switch the market data type. `false` if not connected.
    async fn set_market_data_subscription(&self, mode: MarketDataMode) -> bool;

    /// Current venue-side report for an order, `Ok(None)` if unknown.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or a timeout.
    async fn order_status(
        &self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<ExecutionReport>, BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn market_spec_takes_no_price() {
        let spec = OrderSpec::market(OrderSide::Buy, 2).unwrap();
        assert_eq!(spec.order_type, OrderType::Market);
        assert_eq!(spec.limit_price, None);

        let err = OrderSpec::build(OrderSide::Buy, 2, OrderType::Market, Some(dec!(1))).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidSpecification { .. }));
    }

    #[test_case(None ; "missing price")]
    #[test_case(Some(dec!(0)) ; "zero price")]
    #[test_case(Some(dec!(-1.5)) ; "negative price")]
    fn limit_spec_requires_positive_price(price: Option<Decimal>) {
        let err = OrderSpec::build(OrderSide::Sell, 1, OrderType::Limit, price).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidSpecification { .. }));
    }

    #[test]
    fn limit_spec_keeps_price() {
        let spec = OrderSpec::limit(OrderSide::Sell, 1, dec!(2.50)).unwrap();
        assert_eq!(spec.limit_price, Some(dec!(2.50)));
    }

    #[test]
    fn zero_quantity_is_invalid() {
        assert!(OrderSpec::market(OrderSide::Buy, 0).is_err());
    }

    #[test]
    fn market_data_mode_codes() {
        assert_eq!(MarketDataMode::Live.code(), 1);
        assert_eq!(MarketDataMode::Frozen.code(), 2);
        assert_eq!(MarketDataMode::Delayed.code(), 3);
        assert_eq!("DELAYED".parse::<MarketDataMode>().unwrap(), MarketDataMode::Delayed);
        assert!("snapshot".parse::<MarketDataMode>().is_err());
    }

    #[test]
    fn venue_rejection_keeps_message_verbatim() {
        let err = BrokerError::rejected("Order rejected - reason: No trading permissions");
        assert_eq!(err.to_string(), "Order rejected - reason: No trading permissions");
    }
}
