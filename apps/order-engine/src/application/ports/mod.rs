//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems. The order
//! and recommendation stores are declared next to their aggregates in the
//! domain layer.

mod broker_session_port;

pub use broker_session_port::{
    BrokerError, BrokerSession, Contract, MarketDataMode, OrderSpec, VenueHandle,
};
