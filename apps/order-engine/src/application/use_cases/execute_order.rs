//! Execute Order Use Case

use std::sync::Arc;
use std::time::Instant;

use crate::application::errors::LifecycleError;
use crate::application::ports::{BrokerError, BrokerSession, VenueHandle};
use crate::application::use_cases::apply_execution_report::ApplyExecutionReportUseCase;
use crate::domain::order_execution::{
    ExecutionDetails, Order, OrderRepository, OrderStatus, StatusUpdate, VenueOrderState,
};
use crate::domain::shared::OrderId;
use crate::observability;

/// Use case for submitting a pending order to the venue.
///
/// The order is claimed for the whole submission, so a second execute, a
/// local cancel, a resize or a delete of the same order is refused until it
/// finishes. Every failure before the venue acknowledges leaves the order
/// `pending`; nothing is retried automatically.
pub struct ExecuteOrderUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    session: Arc<S>,
    orders: Arc<O>,
    reports: ApplyExecutionReportUseCase<O>,
}

impl<S, O> ExecuteOrderUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    /// Create a new `ExecuteOrderUseCase`.
    pub fn new(session: Arc<S>, orders: Arc<O>) -> Self {
        Self {
            session,
            reports: ApplyExecutionReportUseCase::new(Arc::clone(&orders)),
            orders,
        }
    }

    /// Execute an order by id and return its stored state afterwards.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `Conflict` unless the order is `pending` and not already claimed
    /// - `InvalidSpecification` if the venue cannot express the order
    /// - `NotConnected` or `VenueFailure` if submission fails
    pub async fn execute(&self, id: OrderId) -> Result<Order, LifecycleError> {
        let started = Instant::now();
        let _claim = self.orders.claims().try_claim(id).ok_or_else(|| {
            LifecycleError::conflict(format!("Order {id} is already being submitted or modified"))
        })?;
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| LifecycleError::order_not_found(id))?;
        order.ensure_submittable()?;

        let order_type = order.order_type();
        let result = if order.is_mock {
            self.fill_mock(&order).await.map(|()| "mock_filled")
        } else {
            self.submit(&order).await.map(|()| "submitted")
        };

        let status = match &result {
            Ok(status) => *status,
            Err(LifecycleError::NotConnected) => "not_connected",
            Err(LifecycleError::InvalidSpecification { .. }) => "invalid_specification",
            Err(_) => "rejected",
        };
        observability::record_order_submission(
            status,
            order_type.code(),
            started.elapsed().as_secs_f64(),
        );
        result?;

        self.orders
            .get(id)
            .await?
            .ok_or_else(|| LifecycleError::order_not_found(id))
    }

    async fn fill_mock(&self, order: &Order) -> Result<(), LifecycleError> {
        let update = order.mock_fill();
        if !self.orders.update_status(order.id, &update).await? {
            return Err(LifecycleError::order_not_found(order.id));
        }
        tracing::info!(
            order_id = %order.id,
            ticker = %order.ticker,
            avg_fill_price = ?order.premium,
            "Mock order filled without venue submission"
        );
        Ok(())
    }

    async fn submit(&self, order: &Order) -> Result<(), LifecycleError> {
        let order_type = order.order_type();
        let limit_price = if order_type.requires_price() {
            order.premium
        } else {
            None
        };
        let spec = self
            .session
            .build_order(order.action, order.quantity, order_type, limit_price)?;

        if !self.session.connect().await {
            tracing::warn!(order_id = %order.id, "Broker session unavailable, order stays pending");
            return Err(LifecycleError::NotConnected);
        }

        let contract = self
            .session
            .resolve_contract(&order.ticker, &order.instrument)
            .await?
            .ok_or_else(|| {
                BrokerError::invalid_specification(format!(
                    "no venue contract for {} {:?}",
                    order.ticker, order.instrument
                ))
            })?;

        let handle = match self.session.submit(&contract, &spec).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    ticker = %order.ticker,
                    error = %e,
                    "Order submission failed, order stays pending"
                );
                return Err(e.into());
            }
        };

        let update = StatusUpdate::to(OrderStatus::Processing)
            .executed(false)
            .with_details(ExecutionDetails::accepted(
                handle.venue_order_id.clone(),
                handle.venue_status.clone(),
                order.quantity,
            ));
        match self.orders.update_status(order.id, &update).await {
            Ok(true) => {}
            Ok(false) => {
                self.withdraw(order, &handle).await;
                return Err(LifecycleError::order_not_found(order.id));
            }
            Err(e) => {
                self.withdraw(order, &handle).await;
                return Err(e.into());
            }
        }

        tracing::info!(
            order_id = %order.id,
            venue_order_id = %handle.venue_order_id,
            ticker = %order.ticker,
            local_symbol = %contract.local_symbol,
            order_type = %order_type.code(),
            "Order submitted"
        );
        self.catch_up(order, &handle).await;
        Ok(())
    }

    /// Cancel a venue order whose local record could not be written, so no
    /// live order is left without a row.
    async fn withdraw(&self, order: &Order, handle: &VenueHandle) {
        match self.session.cancel(&handle.venue_order_id).await {
            Ok(()) => tracing::warn!(
                order_id = %order.id,
                venue_order_id = %handle.venue_order_id,
                "Venue order withdrawn after local write failed"
            ),
            Err(e) => tracing::error!(
                order_id = %order.id,
                venue_order_id = %handle.venue_order_id,
                error = %e,
                "Venue order left live without a local record"
            ),
        }
    }

    /// Reports pushed before the venue order id was stored were discarded by
    /// the consumer; read the venue state once and apply anything it missed.
    async fn catch_up(&self, order: &Order, handle: &VenueHandle) {
        let report = match self.session.order_status(&handle.venue_order_id).await {
            Ok(Some(report)) => report,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(
                    order_id = %order.id,
                    venue_order_id = %handle.venue_order_id,
                    error = %e,
                    "Status check after submit failed"
                );
                return;
            }
        };
        if report.state() == VenueOrderState::Working && report.filled == 0 {
            return;
        }
        if let Err(e) = self.reports.apply(&report).await {
            tracing::warn!(
                order_id = %order.id,
                venue_order_id = %handle.venue_order_id,
                error = %e,
                "Could not apply venue state after submit"
            );
        }
    }
}
