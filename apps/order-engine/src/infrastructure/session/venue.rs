//! Venue client seam.
//!
//! `VenueClient` is the raw, stateful connection to a trading venue. It is
//! not thread-safe on its own: every call takes `&mut self` and the managed
//! session serializes access behind an async mutex. Execution reports are
//! pushed by the client into the report queue it was built with.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::oneshot;

use crate::application::ports::{BrokerError, Contract, MarketDataMode, OrderSpec, VenueHandle};
use crate::domain::order_execution::{ExecutionReport, Instrument};
use crate::domain::shared::VenueOrderId;

/// Where the gateway lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueEndpoint {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Client id presented on connect.
    pub client_id: i32,
}

/// A live quote request.
///
/// The venue completes `price` once a usable quote arrives; the
/// subscription stays open at the venue until cancelled.
#[derive(Debug)]
pub struct QuoteTicket {
    /// Venue-side subscription id.
    pub subscription_id: u64,
    /// Resolves with the first usable price.
    pub price: oneshot::Receiver<Decimal>,
}

/// Raw venue connection.
#[async_trait]
pub trait VenueClient: Send + 'static {
    /// Open the connection.
    async fn connect(&mut self, endpoint: &VenueEndpoint) -> Result<(), BrokerError>;

    /// Close the connection. Idempotent.
    async fn disconnect(&mut self);

    /// Round-trip check used by the keepalive supervisor.
    async fn heartbeat(&mut self) -> Result<(), BrokerError>;

    /// Look up the venue contract for an instrument.
    async fn qualify_contract(
        &mut self,
        ticker: &str,
        instrument: &Instrument,
    ) -> Result<Option<Contract>, BrokerError>;

    /// Transmit an order.
    async fn place_order(
        &mut self,
        contract: &Contract,
        spec: &OrderSpec,
    ) -> Result<VenueHandle, BrokerError>;

    /// Request cancellation of a working order.
    async fn cancel_order(&mut self, venue_order_id: &VenueOrderId) -> Result<(), BrokerError>;

    /// Current execution report of an order, if the venue knows it.
    async fn order_status(
        &mut self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<ExecutionReport>, BrokerError>;

    /// Open a live quote subscription.
    async fn request_quote(&mut self, ticker: &str) -> Result<QuoteTicket, BrokerError>;

    /// Close a live quote subscription. Idempotent.
    async fn cancel_quote(&mut self, subscription_id: u64);

    /// Most recent session close, without opening a subscription.
    async fn last_close(&mut self, ticker: &str) -> Result<Option<Decimal>, BrokerError>;

    /// Switch the market data type for subsequent requests.
    async fn set_market_data_type(&mut self, mode: MarketDataMode) -> Result<(), BrokerError>;
}
