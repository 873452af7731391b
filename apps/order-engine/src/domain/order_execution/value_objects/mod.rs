//! Order Execution Value Objects
//!
//! Immutable types for order management.

mod execution_report;
mod instrument;
mod market_snapshot;
mod order_side;
mod order_status;
mod order_type;

pub use execution_report::{ExecutionDetails, ExecutionReport, VenueOrderState};
pub use instrument::{Instrument, InstrumentKind, OptionRight};
pub use market_snapshot::MarketSnapshot;
pub use order_side::OrderSide;
pub use order_status::OrderStatus;
pub use order_type::OrderType;
