//! Managed broker session.
//!
//! Wraps a [`VenueClient`] as the process-wide [`BrokerSession`]: venue calls
//! are serialized behind an async mutex and bounded by the configured
//! timeouts, transport failures mark the session disconnected, and prices
//! fall back from live quotes to cached and closing prices.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::venue::{VenueClient, VenueEndpoint};
use crate::application::ports::{
    BrokerError, BrokerSession, Contract, MarketDataMode, OrderSpec, VenueHandle,
};
use crate::config::SessionConfig;
use crate::domain::market_calendar::{Clock, SystemClock, is_market_hours};
use crate::domain::order_execution::{ExecutionReport, Instrument};
use crate::domain::shared::VenueOrderId;
use crate::observability;

/// Broker session over a single venue connection.
pub struct ManagedSession<C: VenueClient> {
    client: Arc<Mutex<C>>,
    endpoint: VenueEndpoint,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    connected: AtomicBool,
    price_cache: RwLock<HashMap<String, Decimal>>,
    open_subscriptions: Arc<AtomicUsize>,
}

impl<C: VenueClient> ManagedSession<C> {
    /// Create a disconnected session.
    #[must_use]
    pub fn new(client: C, config: &SessionConfig) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            endpoint: VenueEndpoint {
                host: config.host.clone(),
                port: config.port,
                client_id: config.client_id,
            },
            config: config.clone(),
            clock: Arc::new(SystemClock),
            connected: AtomicBool::new(false),
            price_cache: RwLock::new(HashMap::new()),
            open_subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the clock used for market-hours gating.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Live quote subscriptions currently held open.
    #[must_use]
    pub fn open_subscriptions(&self) -> usize {
        self.open_subscriptions.load(Ordering::SeqCst)
    }

    /// Round-trip the connection.
    ///
    /// Returns false, and marks the session disconnected, if the check fails.
    pub async fn heartbeat(&self) -> bool {
        if !self.is_connected() {
            return false;
        }
        let mut client = self.client.lock().await;
        match timeout(self.config.request_timeout(), client.heartbeat()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Session heartbeat failed");
                self.mark_disconnected();
                false
            }
            Err(_) => {
                tracing::warn!("Session heartbeat timed out");
                self.mark_disconnected();
                false
            }
        }
    }

    /// Flag the session as down without talking to the venue.
    pub fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::warn!(
                host = %self.endpoint.host,
                port = self.endpoint.port,
                "Broker session marked disconnected"
            );
            observability::record_session_state(false);
        }
    }

    fn ensure_connected(&self) -> Result<(), BrokerError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }

    fn ensure_writable(&self) -> Result<(), BrokerError> {
        if self.config.readonly {
            Err(BrokerError::rejected("Session is read-only"))
        } else {
            Ok(())
        }
    }

    /// Bound a venue call by the request timeout.
    async fn guarded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, BrokerError>> + Send,
    ) -> Result<T, BrokerError> {
        match timeout(self.config.request_timeout(), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if matches!(e, BrokerError::Transport { .. } | BrokerError::NotConnected) {
                    self.mark_disconnected();
                }
                Err(e)
            }
            Err(_) => {
                tracing::warn!(operation, "Broker call timed out");
                Err(BrokerError::timeout(operation))
            }
        }
    }

    async fn live_quote(&self, ticker: &str) -> Option<Decimal> {
        let ticket = {
            let mut client = self.client.lock().await;
            match self.guarded("quote", client.request_quote(ticker)).await {
                Ok(ticket) => ticket,
                Err(e) => {
                    tracing::debug!(ticker, error = %e, "Live quote request failed");
                    return None;
                }
            }
        };

        let _subscription = QuoteSubscription::open(
            Arc::clone(&self.client),
            ticket.subscription_id,
            Arc::clone(&self.open_subscriptions),
        );
        match timeout(self.config.quote_timeout(), ticket.price).await {
            Ok(Ok(price)) if price > Decimal::ZERO => Some(price),
            Ok(_) => None,
            Err(_) => {
                tracing::debug!(ticker, "Live quote wait timed out");
                None
            }
        }
    }

    async fn closing_price(&self, ticker: &str) -> Option<Decimal> {
        let mut client = self.client.lock().await;
        match self.guarded("last_close", client.last_close(ticker)).await {
            Ok(close) => close.filter(|p| *p > Decimal::ZERO),
            Err(e) => {
                tracing::debug!(ticker, error = %e, "Close price request failed");
                None
            }
        }
    }

    fn cached_price(&self, ticker: &str) -> Option<Decimal> {
        self.price_cache.read().get(ticker).copied()
    }
}

#[async_trait]
impl<C: VenueClient> BrokerSession for ManagedSession<C> {
    async fn connect(&self) -> bool {
        if self.is_connected() {
            return true;
        }

        let mut client = self.client.lock().await;
        if self.is_connected() {
            return true;
        }

        match timeout(self.config.connect_timeout(), client.connect(&self.endpoint)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(host = %self.endpoint.host, port = self.endpoint.port, error = %e, "Broker connect failed");
                return false;
            }
            Err(_) => {
                tracing::warn!(host = %self.endpoint.host, port = self.endpoint.port, "Broker connect timed out");
                return false;
            }
        }

        let mode = self.config.market_data_mode;
        if let Err(e) = client.set_market_data_type(mode).await {
            tracing::warn!(%mode, error = %e, "Failed to set market data type");
        }

        self.connected.store(true, Ordering::SeqCst);
        observability::record_session_state(true);
        tracing::info!(
            host = %self.endpoint.host,
            port = self.endpoint.port,
            client_id = self.endpoint.client_id,
            readonly = self.config.readonly,
            "Broker session connected"
        );
        true
    }

    async fn disconnect(&self) {
        let mut client = self.client.lock().await;
        client.disconnect().await;
        if self.connected.swap(false, Ordering::SeqCst) {
            observability::record_session_state(false);
            tracing::info!("Broker session disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn resolve_contract(
        &self,
        ticker: &str,
        instrument: &Instrument,
    ) -> Result<Option<Contract>, BrokerError> {
        self.ensure_connected()?;
        let mut client = self.client.lock().await;
        self.guarded("resolve_contract", client.qualify_contract(ticker, instrument))
            .await
    }

    async fn submit(&self, contract: &Contract, spec: &OrderSpec) -> Result<VenueHandle, BrokerError> {
        self.ensure_connected()?;
        self.ensure_writable()?;
        let mut client = self.client.lock().await;
        self.guarded("submit", client.place_order(contract, spec)).await
    }

    async fn cancel(&self, venue_order_id: &VenueOrderId) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        self.ensure_writable()?;
        let mut client = self.client.lock().await;
        self.guarded("cancel", client.cancel_order(venue_order_id)).await
    }

    async fn get_price(&self, ticker: &str) -> Option<Decimal> {
        if !self.is_connected() {
            observability::record_quote_source("unavailable");
            return None;
        }
        let ticker = ticker.trim().to_ascii_uppercase();

        let in_hours = is_market_hours(self.clock.now(), self.config.include_extended_hours);
        let price = if in_hours {
            if let Some(price) = self.live_quote(&ticker).await {
                Some((price, "live"))
            } else if let Some(price) = self.cached_price(&ticker) {
                Some((price, "cache"))
            } else {
                self.closing_price(&ticker).await.map(|p| (p, "close"))
            }
        } else if let Some(price) = self.closing_price(&ticker).await {
            Some((price, "close"))
        } else {
            self.cached_price(&ticker).map(|p| (p, "cache"))
        };

        match price {
            Some((price, source)) => {
                self.price_cache.write().insert(ticker.clone(), price);
                observability::record_quote_source(source);
                tracing::debug!(ticker = %ticker, %price, source, "Price resolved");
                Some(price)
            }
            None => {
                observability::record_quote_source("unavailable");
                None
            }
        }
    }

    async fn set_market_data_subscription(&self, mode: MarketDataMode) -> bool {
        if !self.is_connected() {
            return false;
        }
        let mut client = self.client.lock().await;
        match self
            .guarded("set_market_data_type", client.set_market_data_type(mode))
            .await
        {
            Ok(()) => {
                tracing::info!(%mode, "Market data type switched");
                true
            }
            Err(e) => {
                tracing::warn!(%mode, error = %e, "Failed to switch market data type");
                false
            }
        }
    }

    async fn order_status(
        &self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<ExecutionReport>, BrokerError> {
        self.ensure_connected()?;
        let mut client = self.client.lock().await;
        self.guarded("order_status", client.order_status(venue_order_id))
            .await
    }
}

/// An open live quote subscription, closed at the venue on drop.
///
/// Dropping covers every exit of a price wait: success, timeout, and the
/// caller's future being cancelled.
struct QuoteSubscription<C: VenueClient> {
    client: Arc<Mutex<C>>,
    subscription_id: u64,
    open: Arc<AtomicUsize>,
}

impl<C: VenueClient> QuoteSubscription<C> {
    fn open(client: Arc<Mutex<C>>, subscription_id: u64, open: Arc<AtomicUsize>) -> Self {
        let count = open.fetch_add(1, Ordering::SeqCst) + 1;
        observability::update_open_subscriptions(count);
        Self {
            client,
            subscription_id,
            open,
        }
    }
}

impl<C: VenueClient> Drop for QuoteSubscription<C> {
    fn drop(&mut self) {
        let count = self.open.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        observability::update_open_subscriptions(count);

        let client = Arc::clone(&self.client);
        let subscription_id = self.subscription_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    client.lock().await.cancel_quote(subscription_id).await;
                });
            }
            Err(_) => {
                tracing::warn!(subscription_id, "No runtime to release quote subscription");
            }
        }
    }
}
