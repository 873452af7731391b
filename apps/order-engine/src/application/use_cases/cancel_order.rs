//! Cancel Order Use Case

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::application::errors::LifecycleError;
use crate::application::ports::BrokerSession;
use crate::application::use_cases::apply_execution_report::ApplyExecutionReportUseCase;
use crate::domain::order_execution::{
    Order, OrderRepository, OrderStatus, StatusUpdate, VenueOrderState,
};
use crate::domain::shared::{OrderId, VenueOrderId};
use crate::observability;

/// How long a venue cancel is awaited before reporting it as requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelSettings {
    /// Total time to wait for the venue to confirm.
    pub confirm_timeout: Duration,
    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl Default for CancelSettings {
    fn default() -> Self {
        Self {
            confirm_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Result of a cancel request.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    /// The order is `cancelled`.
    Cancelled(Order),
    /// The venue accepted the request but has not confirmed it yet; the
    /// order is still `processing` and will move when the report arrives.
    Requested(Order),
}

impl CancelOutcome {
    /// The order after the request.
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Cancelled(order) | Self::Requested(order) => order,
        }
    }
}

/// Use case for cancelling an order.
///
/// Pending orders are cancelled locally. Processing orders are cancelled at
/// the venue first and move to `cancelled` once the venue confirms. The
/// order is claimed throughout, so a cancel never interleaves with a submit.
pub struct CancelOrderUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    session: Arc<S>,
    orders: Arc<O>,
    reports: ApplyExecutionReportUseCase<O>,
    settings: CancelSettings,
}

impl<S, O> CancelOrderUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    /// Create a new `CancelOrderUseCase`.
    pub fn new(session: Arc<S>, orders: Arc<O>, settings: CancelSettings) -> Self {
        Self {
            session,
            reports: ApplyExecutionReportUseCase::new(Arc::clone(&orders)),
            orders,
            settings,
        }
    }

    /// Cancel an order by id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `Conflict` if the order is already terminal, filled while cancelling,
    ///   or claimed by a submission in progress
    /// - `NotConnected` or `VenueFailure` if the venue cancel fails
    pub async fn execute(&self, id: OrderId) -> Result<CancelOutcome, LifecycleError> {
        let _claim = self.orders.claims().try_claim(id).ok_or_else(|| {
            LifecycleError::conflict(format!(
                "Order {id} is being submitted or modified; retry the cancel once it settles"
            ))
        })?;
        let order = self.load(id).await?;

        let result = match (order.status, order.execution.venue_order_id.clone()) {
            (OrderStatus::Pending, _) => self.cancel_locally(&order).await,
            (OrderStatus::Processing, _) if order.is_mock => self.cancel_locally(&order).await,
            (OrderStatus::Processing, None) => self.cancel_locally(&order).await,
            (OrderStatus::Processing, Some(venue_order_id)) => {
                self.cancel_at_venue(&order, &venue_order_id).await
            }
            (status, _) => Err(LifecycleError::conflict(format!(
                "Order {id} is already {status} and cannot be cancelled"
            ))),
        };

        match &result {
            Ok(CancelOutcome::Cancelled(_)) => {}
            Ok(CancelOutcome::Requested(_)) => observability::record_order_cancel("requested"),
            Err(_) => observability::record_order_cancel("failed"),
        }
        result
    }

    async fn load(&self, id: OrderId) -> Result<Order, LifecycleError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| LifecycleError::order_not_found(id))
    }

    async fn cancel_locally(&self, order: &Order) -> Result<CancelOutcome, LifecycleError> {
        let update = StatusUpdate::to(OrderStatus::Cancelled).executed(order.executed);
        if !self.orders.update_status(order.id, &update).await? {
            return Err(LifecycleError::order_not_found(order.id));
        }
        observability::record_order_cancel("local");
        tracing::info!(order_id = %order.id, ticker = %order.ticker, "Order cancelled locally");
        Ok(CancelOutcome::Cancelled(self.load(order.id).await?))
    }

    async fn cancel_at_venue(
        &self,
        order: &Order,
        venue_order_id: &VenueOrderId,
    ) -> Result<CancelOutcome, LifecycleError> {
        if !self.session.connect().await {
            return Err(LifecycleError::NotConnected);
        }
        self.session.cancel(venue_order_id).await?;
        tracing::info!(
            order_id = %order.id,
            venue_order_id = %venue_order_id,
            "Venue cancel requested"
        );

        let deadline = Instant::now() + self.settings.confirm_timeout;
        loop {
            match self.session.order_status(venue_order_id).await {
                Ok(Some(report)) if report.state() != VenueOrderState::Working => {
                    self.reports.apply(&report).await?;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        order_id = %order.id,
                        venue_order_id = %venue_order_id,
                        error = %e,
                        "Status poll failed while awaiting cancel confirmation"
                    );
                }
            }
            if Instant::now() + self.settings.poll_interval > deadline {
                break;
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }

        let current = self.load(order.id).await?;
        match current.status {
            OrderStatus::Cancelled => {
                observability::record_order_cancel("confirmed");
                Ok(CancelOutcome::Cancelled(current))
            }
            OrderStatus::Completed => Err(LifecycleError::conflict(format!(
                "Order {} filled before the cancel took effect",
                order.id
            ))),
            OrderStatus::Pending | OrderStatus::Processing => {
                tracing::warn!(
                    order_id = %order.id,
                    venue_order_id = %venue_order_id,
                    "Venue has not confirmed cancel yet"
                );
                Ok(CancelOutcome::Requested(current))
            }
        }
    }
}
