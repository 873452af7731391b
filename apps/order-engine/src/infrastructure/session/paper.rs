//! Paper venue.
//!
//! Deterministic in-process venue used in PAPER mode and in tests. Orders
//! get ids `P1`, `P2`, ... and, when auto-fill is on, fill at their limit
//! price (or the quoted price) after a fixed delay. Every state change is
//! pushed to the report queue.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::oneshot;

use super::venue::{QuoteTicket, VenueClient, VenueEndpoint};
use crate::application::ports::{BrokerError, Contract, MarketDataMode, OrderSpec, VenueHandle};
use crate::application::services::ReportSender;
use crate::config::PaperVenueConfig;
use crate::domain::order_execution::{ExecutionReport, Instrument, VenueOrderState};
use crate::domain::shared::VenueOrderId;

#[derive(Debug)]
struct PaperOrder {
    ticker: String,
    limit_price: Option<Decimal>,
    report: ExecutionReport,
}

#[derive(Debug)]
struct PaperBook {
    reachable: bool,
    connected: bool,
    mode: MarketDataMode,
    next_order: u64,
    next_subscription: u64,
    next_con_id: i64,
    orders: HashMap<VenueOrderId, PaperOrder>,
    prices: BTreeMap<String, Decimal>,
    closes: BTreeMap<String, Decimal>,
    unknown: HashSet<String>,
    open_quotes: HashMap<u64, String>,
    quote_waiters: HashMap<u64, oneshot::Sender<Decimal>>,
}

#[derive(Debug)]
struct PaperShared {
    book: Mutex<PaperBook>,
    reports: Option<ReportSender>,
    fill_delay: Duration,
    auto_fill: bool,
}

impl PaperShared {
    fn push(&self, report: ExecutionReport) {
        let Some(reports) = &self.reports else {
            return;
        };
        if let Err(e) = reports.try_send(report) {
            tracing::warn!(error = %e, "Report queue full or closed, report dropped");
        }
    }

    fn fill(&self, venue_order_id: &VenueOrderId, price: Option<Decimal>) -> Option<ExecutionReport> {
        let report = {
            let mut book = self.book.lock();
            let market = {
                let order = book.orders.get(venue_order_id)?;
                book.prices.get(&order.ticker).copied()
            };
            let order = book.orders.get_mut(venue_order_id)?;
            if order.report.state() != VenueOrderState::Working {
                return None;
            }
            let total = order.report.filled + order.report.remaining;
            order.report.venue_status = "Filled".to_string();
            order.report.filled = total;
            order.report.remaining = 0;
            order.report.avg_fill_price = price.or(order.limit_price).or(market);
            order.report.clone()
        };
        self.push(report.clone());
        Some(report)
    }
}

/// In-process paper venue.
#[derive(Debug)]
pub struct PaperVenue {
    shared: Arc<PaperShared>,
}

/// Handle for steering a paper venue from outside the session.
#[derive(Debug, Clone)]
pub struct PaperControl {
    shared: Arc<PaperShared>,
}

impl PaperVenue {
    /// Create a paper venue pushing reports into `reports`.
    #[must_use]
    pub fn new(config: &PaperVenueConfig, reports: Option<ReportSender>) -> Self {
        let prices: BTreeMap<String, Decimal> = config
            .prices
            .iter()
            .map(|(ticker, price)| (ticker.to_ascii_uppercase(), *price))
            .collect();
        Self {
            shared: Arc::new(PaperShared {
                book: Mutex::new(PaperBook {
                    reachable: true,
                    connected: false,
                    mode: MarketDataMode::default(),
                    next_order: 0,
                    next_subscription: 0,
                    next_con_id: 0,
                    orders: HashMap::new(),
                    closes: prices.clone(),
                    prices,
                    unknown: HashSet::new(),
                    open_quotes: HashMap::new(),
                    quote_waiters: HashMap::new(),
                }),
                reports,
                fill_delay: Duration::from_millis(config.fill_delay_ms),
                auto_fill: config.auto_fill,
            }),
        }
    }

    /// Control handle sharing this venue's state.
    #[must_use]
    pub fn control(&self) -> PaperControl {
        PaperControl {
            shared: Arc::clone(&self.shared),
        }
    }

    fn ensure_connected(&self) -> Result<(), BrokerError> {
        if self.shared.book.lock().connected {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }
}

impl PaperControl {
    /// Set the quoted price, answering any waiting quote requests.
    pub fn set_price(&self, ticker: &str, price: Decimal) {
        let ticker = ticker.to_ascii_uppercase();
        let mut book = self.shared.book.lock();
        book.prices.insert(ticker.clone(), price);
        let waiting: Vec<u64> = book
            .open_quotes
            .iter()
            .filter(|(_, t)| **t == ticker)
            .map(|(id, _)| *id)
            .collect();
        for id in waiting {
            if let Some(tx) = book.quote_waiters.remove(&id) {
                let _ = tx.send(price);
            }
        }
    }

    /// Set the last session close.
    pub fn set_close(&self, ticker: &str, close: Decimal) {
        self.shared
            .book
            .lock()
            .closes
            .insert(ticker.to_ascii_uppercase(), close);
    }

    /// Make contract lookups for a ticker come back empty.
    pub fn mark_unknown(&self, ticker: &str) {
        self.shared
            .book
            .lock()
            .unknown
            .insert(ticker.to_ascii_uppercase());
    }

    /// Take the gateway up or down. Going down drops the connection.
    pub fn set_reachable(&self, reachable: bool) {
        let mut book = self.shared.book.lock();
        book.reachable = reachable;
        if !reachable {
            book.connected = false;
        }
    }

    /// Whether a client is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.book.lock().connected
    }

    /// Live quote subscriptions still open at the venue.
    #[must_use]
    pub fn open_quotes(&self) -> usize {
        self.shared.book.lock().open_quotes.len()
    }

    /// Current market data type.
    #[must_use]
    pub fn market_data_mode(&self) -> MarketDataMode {
        self.shared.book.lock().mode
    }

    /// Fill a working order now and push the report.
    pub fn fill(&self, venue_order_id: &VenueOrderId, price: Option<Decimal>) -> Option<ExecutionReport> {
        self.shared.fill(venue_order_id, price)
    }
}

fn local_symbol(ticker: &str, instrument: &Instrument) -> String {
    match instrument {
        Instrument::Equity => ticker.to_string(),
        Instrument::Option {
            right,
            strike,
            expiration,
        } => {
            let strike_code = (*strike * Decimal::from(1_000))
                .trunc()
                .to_u64()
                .unwrap_or_default();
            format!(
                "{ticker:<6}{}{}{strike_code:08}",
                expiration.format("%y%m%d"),
                right.code()
            )
        }
    }
}

#[async_trait]
impl VenueClient for PaperVenue {
    async fn connect(&mut self, endpoint: &VenueEndpoint) -> Result<(), BrokerError> {
        let mut book = self.shared.book.lock();
        if !book.reachable {
            return Err(BrokerError::Transport {
                message: format!(
                    "connection refused by {}:{} (client {})",
                    endpoint.host, endpoint.port, endpoint.client_id
                ),
            });
        }
        book.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        let mut book = self.shared.book.lock();
        book.connected = false;
        book.open_quotes.clear();
        book.quote_waiters.clear();
    }

    async fn heartbeat(&mut self) -> Result<(), BrokerError> {
        let book = self.shared.book.lock();
        if !book.reachable {
            return Err(BrokerError::Transport {
                message: "connection lost".to_string(),
            });
        }
        if book.connected {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }

    async fn qualify_contract(
        &mut self,
        ticker: &str,
        instrument: &Instrument,
    ) -> Result<Option<Contract>, BrokerError> {
        self.ensure_connected()?;
        let ticker = ticker.to_ascii_uppercase();
        let mut book = self.shared.book.lock();
        if book.unknown.contains(&ticker) {
            return Ok(None);
        }
        book.next_con_id += 1;
        Ok(Some(Contract {
            con_id: book.next_con_id,
            local_symbol: local_symbol(&ticker, instrument),
            ticker,
            instrument: instrument.clone(),
        }))
    }

    async fn place_order(
        &mut self,
        contract: &Contract,
        spec: &OrderSpec,
    ) -> Result<VenueHandle, BrokerError> {
        self.ensure_connected()?;
        let report = {
            let mut book = self.shared.book.lock();
            book.next_order += 1;
            let venue_order_id = VenueOrderId::new(format!("P{}", book.next_order));
            let report = ExecutionReport::new(venue_order_id.clone(), "Submitted", 0, spec.quantity);
            book.orders.insert(
                venue_order_id,
                PaperOrder {
                    ticker: contract.ticker.clone(),
                    limit_price: spec.limit_price,
                    report: report.clone(),
                },
            );
            report
        };

        tracing::debug!(
            venue_order_id = %report.venue_order_id,
            local_symbol = %contract.local_symbol,
            quantity = spec.quantity,
            "Paper order accepted"
        );
        self.shared.push(report.clone());

        if self.shared.auto_fill {
            let shared = Arc::clone(&self.shared);
            let venue_order_id = report.venue_order_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(shared.fill_delay).await;
                shared.fill(&venue_order_id, None);
            });
        }

        Ok(VenueHandle {
            venue_order_id: report.venue_order_id,
            venue_status: report.venue_status,
        })
    }

    async fn cancel_order(&mut self, venue_order_id: &VenueOrderId) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        let report = {
            let mut book = self.shared.book.lock();
            let Some(order) = book.orders.get_mut(venue_order_id) else {
                return Err(BrokerError::rejected(format!(
                    "Order {venue_order_id} not found"
                )));
            };
            match order.report.state() {
                VenueOrderState::Filled => {
                    return Err(BrokerError::rejected("Order already filled"));
                }
                VenueOrderState::Cancelled => return Ok(()),
                VenueOrderState::Working => {}
            }
            order.report.venue_status = "Cancelled".to_string();
            order.report.clone()
        };
        self.shared.push(report);
        Ok(())
    }

    async fn order_status(
        &mut self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<ExecutionReport>, BrokerError> {
        self.ensure_connected()?;
        Ok(self
            .shared
            .book
            .lock()
            .orders
            .get(venue_order_id)
            .map(|o| o.report.clone()))
    }

    async fn request_quote(&mut self, ticker: &str) -> Result<QuoteTicket, BrokerError> {
        self.ensure_connected()?;
        let ticker = ticker.to_ascii_uppercase();
        let (tx, rx) = oneshot::channel();
        let mut book = self.shared.book.lock();
        book.next_subscription += 1;
        let subscription_id = book.next_subscription;
        book.open_quotes.insert(subscription_id, ticker.clone());
        match book.prices.get(&ticker).copied() {
            Some(price) => {
                let _ = tx.send(price);
            }
            None => {
                book.quote_waiters.insert(subscription_id, tx);
            }
        }
        Ok(QuoteTicket {
            subscription_id,
            price: rx,
        })
    }

    async fn cancel_quote(&mut self, subscription_id: u64) {
        let mut book = self.shared.book.lock();
        book.open_quotes.remove(&subscription_id);
        book.quote_waiters.remove(&subscription_id);
    }

    async fn last_close(&mut self, ticker: &str) -> Result<Option<Decimal>, BrokerError> {
        self.ensure_connected()?;
        Ok(self
            .shared
            .book
            .lock()
            .closes
            .get(&ticker.to_ascii_uppercase())
            .copied())
    }

    async fn set_market_data_type(&mut self, mode: MarketDataMode) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        self.shared.book.lock().mode = mode;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::report_channel;
    use crate::domain::order_execution::{OptionRight, OrderSide, OrderType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn endpoint() -> VenueEndpoint {
        VenueEndpoint {
            host: "127.0.0.1".into(),
            port: 7497,
            client_id: 1,
        }
    }

    fn manual() -> PaperVenueConfig {
        PaperVenueConfig {
            auto_fill: false,
            ..PaperVenueConfig::default()
        }
    }

    fn put() -> Instrument {
        Instrument::option(
            OptionRight::Put,
            dec!(150),
            NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
        )
        .unwrap()
    }

    fn sell_limit() -> OrderSpec {
        OrderSpec::build(OrderSide::Sell, 1, OrderType::Limit, Some(dec!(2.50))).unwrap()
    }

    #[test]
    fn option_local_symbol_is_occ_style() {
        assert_eq!(local_symbol("AAPL", &put()), "AAPL  241220P00150000");
        assert_eq!(local_symbol("SPY", &Instrument::Equity), "SPY");
    }

    #[tokio::test]
    async fn calls_fail_until_connected() {
        let mut venue = PaperVenue::new(&manual(), None);
        assert_eq!(
            venue.qualify_contract("AAPL", &put()).await.unwrap_err(),
            BrokerError::NotConnected
        );

        venue.connect(&endpoint()).await.unwrap();
        let contract = venue.qualify_contract("aapl", &put()).await.unwrap().unwrap();
        assert_eq!(contract.ticker, "AAPL");
    }

    #[tokio::test]
    async fn unreachable_gateway_refuses_connect() {
        let mut venue = PaperVenue::new(&manual(), None);
        venue.control().set_reachable(false);
        assert!(matches!(
            venue.connect(&endpoint()).await,
            Err(BrokerError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn order_flow_pushes_reports() {
        let (tx, mut rx) = report_channel(8);
        let mut venue = PaperVenue::new(&manual(), Some(tx));
        let control = venue.control();
        venue.connect(&endpoint()).await.unwrap();
        let contract = venue.qualify_contract("AAPL", &put()).await.unwrap().unwrap();

        let handle = venue.place_order(&contract, &sell_limit()).await.unwrap();
        assert_eq!(handle.venue_order_id, VenueOrderId::new("P1"));
        assert_eq!(rx.recv().await.unwrap().venue_status, "Submitted");

        let filled = control.fill(&handle.venue_order_id, None).unwrap();
        assert_eq!(filled.avg_fill_price, Some(dec!(2.50)));
        assert_eq!(rx.recv().await.unwrap(), filled);

        assert_eq!(
            venue.cancel_order(&handle.venue_order_id).await.unwrap_err(),
            BrokerError::rejected("Order already filled")
        );
    }

    #[tokio::test]
    async fn cancel_is_pushed_and_idempotent() {
        let (tx, mut rx) = report_channel(8);
        let mut venue = PaperVenue::new(&manual(), Some(tx));
        venue.connect(&endpoint()).await.unwrap();
        let contract = venue.qualify_contract("AAPL", &put()).await.unwrap().unwrap();
        let handle = venue.place_order(&contract, &sell_limit()).await.unwrap();
        rx.recv().await.unwrap();

        venue.cancel_order(&handle.venue_order_id).await.unwrap();
        venue.cancel_order(&handle.venue_order_id).await.unwrap();

        let report = rx.recv().await.unwrap();
        assert_eq!(report.state(), VenueOrderState::Cancelled);
        assert!(rx.try_recv().is_err());
        assert!(venue.shared.fill(&handle.venue_order_id, None).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_fill_fires_after_delay() {
        let (tx, mut rx) = report_channel(8);
        let config = PaperVenueConfig {
            fill_delay_ms: 100,
            ..PaperVenueConfig::default()
        };
        let mut venue = PaperVenue::new(&config, Some(tx));
        venue.connect(&endpoint()).await.unwrap();
        let contract = venue.qualify_contract("AAPL", &put()).await.unwrap().unwrap();
        let handle = venue.place_order(&contract, &sell_limit()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().venue_status, "Submitted");
        let filled = rx.recv().await.unwrap();
        assert_eq!(filled.venue_status, "Filled");

        let status = venue.order_status(&handle.venue_order_id).await.unwrap().unwrap();
        assert_eq!(status, filled);
    }

    #[tokio::test]
    async fn quotes_resolve_when_price_arrives() {
        let mut venue = PaperVenue::new(&manual(), None);
        let control = venue.control();
        venue.connect(&endpoint()).await.unwrap();

        let ticket = venue.request_quote("MSFT").await.unwrap();
        assert_eq!(control.open_quotes(), 1);
        control.set_price("MSFT", dec!(410.10));
        assert_eq!(ticket.price.await.unwrap(), dec!(410.10));

        venue.cancel_quote(ticket.subscription_id).await;
        assert_eq!(control.open_quotes(), 0);
    }
}
