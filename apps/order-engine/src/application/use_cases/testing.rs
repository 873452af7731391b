//! Hand-written fakes for the store and session ports.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{BrokerError, BrokerSession, Contract, MarketDataMode, OrderSpec, VenueHandle};
use crate::domain::order_execution::{
    ExecutionDetails, ExecutionReport, Instrument, NewOrder, OptionRight, Order, OrderClaims,
    OrderFilter, OrderRepository, OrderSide, OrderStateMachine, OrderStatus, StatusUpdate,
    StoreError,
};
use crate::domain::shared::{OrderId, VenueOrderId};

pub fn aapl_put() -> NewOrder {
    NewOrder::new(
        "AAPL",
        Instrument::option(
            OptionRight::Put,
            dec!(150.0),
            NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
        )
        .unwrap(),
        OrderSide::Sell,
        1,
        Some(dec!(2.50)),
    )
}

#[derive(Default)]
pub struct FakeStore {
    orders: Mutex<BTreeMap<i64, Order>>,
    next_id: AtomicI64,
    claims: OrderClaims,
    pub fail_create: AtomicBool,
    /// Refuse writes that move an order to `processing`.
    pub fail_processing_write: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.orders.lock().get(&id.value()).cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.lock().len()
    }
}

#[async_trait]
impl OrderRepository for FakeStore {
    fn claims(&self) -> &OrderClaims {
        &self.claims
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn create(&self, order: &NewOrder) -> Result<OrderId, StoreError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("database is locked".into()));
        }
        order.validate()?;
        let id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        self.orders.lock().insert(
            id.value(),
            Order {
                id,
                ticker: order.ticker.clone(),
                instrument: order.instrument.clone(),
                action: order.action,
                quantity: order.quantity,
                premium: order.premium,
                snapshot: order.snapshot.clone(),
                status: OrderStatus::Pending,
                executed: false,
                execution: ExecutionDetails::default(),
                is_mock: order.is_mock,
                is_rollover: order.is_rollover,
                rolled_from: order.rolled_from,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.order(id))
    }

    async fn get_by_venue_order_id(
        &self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .orders
            .lock()
            .values()
            .find(|o| o.execution.venue_order_id.as_ref() == Some(venue_order_id))
            .cloned())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.lock();
        let matching = orders.values().rev().filter(|o| filter.matches(o)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn update_status(&self, id: OrderId, update: &StatusUpdate) -> Result<bool, StoreError> {
        if update.status == OrderStatus::Processing && self.fail_processing_write.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("disk I/O error".into()));
        }
        let mut orders = self.orders.lock();
        let Some(order) = orders.get_mut(&id.value()) else {
            return Ok(false);
        };
        OrderStateMachine::validate_transition(order.status, update.status)?;
        order.status = update.status;
        if let Some(executed) = update.executed {
            order.executed = executed;
        }
        order.execution = order.execution.clone().merged(&update.details);
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_quantity(&self, id: OrderId, quantity: u32) -> Result<bool, StoreError> {
        let mut orders = self.orders.lock();
        match orders.get_mut(&id.value()) {
            Some(order) if order.status == OrderStatus::Pending => {
                order.quantity = quantity;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        Ok(self.orders.lock().remove(&id.value()).is_some())
    }
}

/// Scriptable broker session.
pub struct FakeSession {
    connected: AtomicBool,
    pub accept_connect: AtomicBool,
    pub contract_missing: AtomicBool,
    /// Fill orders before `submit` returns, as a venue pushing the fill
    /// ahead of the acknowledgement would.
    pub fill_on_submit: AtomicBool,
    pub submit_error: Mutex<Option<BrokerError>>,
    pub cancel_error: Mutex<Option<BrokerError>>,
    /// Whether a cancel request is reflected in `order_status`.
    pub cancel_confirms: AtomicBool,
    pub submits: AtomicUsize,
    pub cancels: Mutex<Vec<VenueOrderId>>,
    pub reports: Mutex<HashMap<VenueOrderId, ExecutionReport>>,
    pub prices: Mutex<HashMap<String, Decimal>>,
    next_venue_id: AtomicUsize,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(false),
            accept_connect: AtomicBool::new(true),
            contract_missing: AtomicBool::new(false),
            fill_on_submit: AtomicBool::new(false),
            submit_error: Mutex::new(None),
            cancel_error: Mutex::new(None),
            cancel_confirms: AtomicBool::new(true),
            submits: AtomicUsize::new(0),
            cancels: Mutex::new(Vec::new()),
            reports: Mutex::new(HashMap::new()),
            prices: Mutex::new(HashMap::new()),
            next_venue_id: AtomicUsize::new(0),
        }
    }
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        let session = Self::default();
        session.accept_connect.store(false, Ordering::SeqCst);
        session
    }

    pub fn set_report(&self, report: ExecutionReport) {
        self.reports
            .lock()
            .insert(report.venue_order_id.clone(), report);
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerSession for FakeSession {
    async fn connect(&self) -> bool {
        if self.accept_connect.load(Ordering::SeqCst) {
            self.connected.store(true, Ordering::SeqCst);
        }
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn resolve_contract(
        &self,
        ticker: &str,
        instrument: &Instrument,
    ) -> Result<Option<Contract>, BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        if self.contract_missing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(Contract {
            con_id: 1,
            ticker: ticker.to_string(),
            instrument: instrument.clone(),
            local_symbol: ticker.to_string(),
        }))
    }

    async fn submit(&self, _contract: &Contract, spec: &OrderSpec) -> Result<VenueHandle, BrokerError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        if let Some(err) = self.submit_error.lock().clone() {
            return Err(err);
        }
        let n = self.next_venue_id.fetch_add(1, Ordering::SeqCst) + 1;
        let venue_order_id = VenueOrderId::new(format!("V{n}"));
        let report = if self.fill_on_submit.load(Ordering::SeqCst) {
            let mut report = ExecutionReport::new(venue_order_id.clone(), "Filled", spec.quantity, 0);
            report.avg_fill_price = spec.limit_price;
            report
        } else {
            ExecutionReport::new(venue_order_id.clone(), "Submitted", 0, spec.quantity)
        };
        self.set_report(report);
        Ok(VenueHandle {
            venue_order_id,
            venue_status: "Submitted".to_string(),
        })
    }

    async fn cancel(&self, venue_order_id: &VenueOrderId) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        if let Some(err) = self.cancel_error.lock().clone() {
            return Err(err);
        }
        self.cancels.lock().push(venue_order_id.clone());
        if self.cancel_confirms.load(Ordering::SeqCst) {
            let mut reports = self.reports.lock();
            if let Some(report) = reports.get_mut(venue_order_id) {
                report.venue_status = "Cancelled".to_string();
            }
        }
        Ok(())
    }

    async fn get_price(&self, ticker: &str) -> Option<Decimal> {
        if !self.is_connected() {
            return None;
        }
        self.prices.lock().get(ticker).copied()
    }

    async fn set_market_data_subscription(&self, _mode: MarketDataMode) -> bool {
        self.is_connected()
    }

    async fn order_status(
        &self,
        venue_order_id: &VenueOrderId,
    ) -> Result<Option<ExecutionReport>, BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        Ok(self.reports.lock().get(venue_order_id).cloned())
    }
}
