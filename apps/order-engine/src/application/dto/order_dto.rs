//! Order DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market_calendar::{format_expiration, parse_expiration};
use crate::domain::order_execution::value_objects::{
    Instrument, InstrumentKind, MarketSnapshot, OptionRight, OrderSide, OrderStatus, OrderType,
};
use crate::domain::order_execution::{NewOrder, Order, OrderError};
use crate::domain::shared::OrderId;

/// DTO for creating an order.
///
/// Every field is optional on the wire so that missing fields surface as
/// validation errors naming the field rather than as parse failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderDto {
    /// Underlying ticker.
    pub ticker: Option<String>,
    /// PUT or CALL (options only).
    pub option_type: Option<String>,
    /// BUY or SELL.
    pub action: Option<String>,
    /// Strike (options only).
    pub strike: Option<Decimal>,
    /// Expiration as `YYYYMMDD` (options only).
    pub expiration: Option<String>,
    /// Requested premium / limit price.
    pub premium: Option<Decimal>,
    /// Contracts or shares.
    pub quantity: Option<i64>,
    /// Snapshot bid.
    pub bid: Option<Decimal>,
    /// Snapshot ask.
    pub ask: Option<Decimal>,
    /// Snapshot last.
    pub last: Option<Decimal>,
    /// Snapshot delta.
    pub delta: Option<f64>,
    /// Snapshot gamma.
    pub gamma: Option<f64>,
    /// Snapshot theta.
    pub theta: Option<f64>,
    /// Snapshot vega.
    pub vega: Option<f64>,
    /// Snapshot implied volatility.
    pub implied_volatility: Option<f64>,
    /// Snapshot open interest.
    pub open_interest: Option<i64>,
    /// Snapshot volume.
    pub volume: Option<i64>,
    /// Never sent to the venue.
    #[serde(default)]
    pub is_mock: bool,
    /// Part of a rollover.
    #[serde(default, rename = "isRollover", alias = "is_rollover")]
    pub is_rollover: bool,
    /// Order this one rolls.
    #[serde(default)]
    pub rolled_from_order_id: Option<i64>,
    /// EQUITY or OPTION; defaults to OPTION.
    #[serde(default)]
    pub instrument_kind: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, OrderError> {
    value.ok_or_else(|| OrderError::missing(field))
}

impl CreateOrderDto {
    /// Validate and convert into an order intent.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first missing or malformed
    /// field, or an invalid specification for an unsupported option right
    /// or instrument kind.
    pub fn into_new_order(self) -> Result<NewOrder, OrderError> {
        let ticker = required(self.ticker.as_deref(), "ticker")?
            .trim()
            .to_ascii_uppercase();
        if ticker.is_empty() {
            return Err(OrderError::missing("ticker"));
        }

        let kind = match self.instrument_kind.as_deref() {
            Some(raw) => raw.parse::<InstrumentKind>()?,
            None => InstrumentKind::Option,
        };

        let instrument = match kind {
            InstrumentKind::Equity => Instrument::Equity,
            InstrumentKind::Option => {
                let right = required(self.option_type.as_deref(), "option_type")?
                    .parse::<OptionRight>()?;
                let strike = required(self.strike, "strike")?;
                let expiration = parse_expiration(required(
                    self.expiration.as_deref(),
                    "expiration",
                )?)?;
                Instrument::option(right, strike, expiration)?
            }
        };

        let action = required(self.action.as_deref(), "action")?.parse::<OrderSide>()?;

        let quantity = required(self.quantity, "quantity")?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                OrderError::validation("quantity", "quantity must be a positive integer")
            })?;

        let snapshot = MarketSnapshot {
            bid: self.bid,
            ask: self.ask,
            last: self.last,
            implied_volatility: self.implied_volatility,
            delta: self.delta,
            gamma: self.gamma,
            theta: self.theta,
            vega: self.vega,
            open_interest: self.open_interest,
            volume: self.volume,
        };

        let mut order =
            NewOrder::new(ticker, instrument, action, quantity, self.premium).with_snapshot(snapshot);
        if self.is_mock {
            order = order.mock();
        }
        order.is_rollover = self.is_rollover;
        order.rolled_from = self.rolled_from_order_id.map(OrderId::new);

        order.validate()?;
        Ok(order)
    }
}

/// DTO representing a stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDto {
    /// Order id.
    pub id: OrderId,
    /// Underlying ticker.
    pub ticker: String,
    /// EQUITY or OPTION.
    pub instrument_kind: InstrumentKind,
    /// PUT or CALL.
    pub option_type: Option<OptionRight>,
    /// Strike.
    pub strike: Option<Decimal>,
    /// Expiration as `YYYYMMDD`.
    pub expiration: Option<String>,
    /// BUY or SELL.
    pub action: OrderSide,
    /// Quantity.
    pub quantity: u32,
    /// Requested premium.
    pub premium: Option<Decimal>,
    /// Market or limit.
    pub order_type: OrderType,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Any quantity executed.
    pub executed: bool,
    /// Rehearsal order.
    pub is_mock: bool,
    /// Part of a rollover.
    pub is_rollover: bool,
    /// Order this one rolls.
    pub rolled_from_order_id: Option<OrderId>,
    /// Venue order id.
    pub venue_order_id: Option<String>,
    /// Venue status string.
    pub venue_status: Option<String>,
    /// Filled quantity.
    pub filled: Option<u32>,
    /// Remaining quantity.
    pub remaining: Option<u32>,
    /// Average fill price.
    pub avg_fill_price: Option<Decimal>,
    /// Market snapshot at creation.
    #[serde(flatten)]
    pub snapshot: MarketSnapshot,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Updated at.
    pub updated_at: DateTime<Utc>,
}

impl OrderDto {
    /// Create from domain Order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id,
            ticker: order.ticker.clone(),
            instrument_kind: order.instrument.kind(),
            option_type: order.instrument.option_right(),
            strike: order.instrument.strike(),
            expiration: order.instrument.expiration().map(format_expiration),
            action: order.action,
            quantity: order.quantity,
            premium: order.premium,
            order_type: order.order_type(),
            status: order.status,
            executed: order.executed,
            is_mock: order.is_mock,
            is_rollover: order.is_rollover,
            rolled_from_order_id: order.rolled_from,
            venue_order_id: order
                .execution
                .venue_order_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            venue_status: order.execution.venue_status.clone(),
            filled: order.execution.filled,
            remaining: order.execution.remaining,
            avg_fill_price: order.execution.avg_fill_price,
            snapshot: order.snapshot.clone(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Response after creating an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderResponseDto {
    /// Always true.
    pub success: bool,
    /// New order id.
    pub order_id: OrderId,
}

/// A list of orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersResponseDto {
    /// Orders, newest first.
    pub orders: Vec<OrderDto>,
}

impl OrdersResponseDto {
    /// Build from domain orders.
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        Self {
            orders: orders.iter().map(OrderDto::from_order).collect(),
        }
    }
}

/// Body of a quantity update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuantityDto {
    /// New quantity.
    pub quantity: Option<i64>,
}

impl UpdateQuantityDto {
    /// Validated quantity.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless a positive quantity is present.
    pub fn validated(&self) -> Result<u32, OrderError> {
        let quantity = required(self.quantity, "quantity")?;
        u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| OrderError::validation("quantity", "quantity must be a positive integer"))
    }
}

/// Body of a rollover request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolloverRequestDto {
    /// Order being rolled.
    pub prior_order_id: Option<i64>,
    /// Replacement order.
    #[serde(default)]
    pub replacement: CreateOrderDto,
}

/// Response after a rollover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverResponseDto {
    /// Always true.
    pub success: bool,
    /// Cancelled prior order.
    pub prior_order_id: OrderId,
    /// Replacement order.
    pub order_id: OrderId,
}

/// Response of execute and cancel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderActionResponseDto {
    /// Always true.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Order after the action.
    pub order: OrderDto,
}
