//! Order Aggregate
//!
//! The persisted order row and the validated intent that creates it.

mod order;

pub use order::{MOCK_FILL_STATUS, NewOrder, Order};
