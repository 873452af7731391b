//! Order Execution Bounded Context
//!
//! Manages the order lifecycle from intent to a terminal state.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: the persisted row and the transitions it may take
//! - **Execution Reports**: venue-side progress mapped onto local status
//! - **Fill Balance**: once submitted, `filled + remaining = quantity`

pub mod aggregate;
pub mod claims;
pub mod errors;
pub mod repository;
pub mod services;
pub mod value_objects;

pub use aggregate::{MOCK_FILL_STATUS, NewOrder, Order};
pub use claims::{OrderClaim, OrderClaims};
pub use errors::OrderError;
pub use repository::{OrderFilter, OrderRepository, StatusUpdate, StoreError};
pub use services::OrderStateMachine;
pub use value_objects::{
    ExecutionDetails, ExecutionReport, Instrument, InstrumentKind, MarketSnapshot, OptionRight,
    OrderSide, OrderStatus, OrderType, VenueOrderState,
};
