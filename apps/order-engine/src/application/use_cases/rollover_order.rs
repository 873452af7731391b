//! Rollover Order Use Case
//!
//! Cancels a prior order and creates its replacement flagged as a rollover.
//! The two steps are not atomic: when the cancel succeeds and the create
//! fails the caller gets a `PartialRollover` naming the cancelled order.

use std::sync::Arc;

use crate::application::dto::RolloverRequestDto;
use crate::application::errors::LifecycleError;
use crate::application::ports::BrokerSession;
use crate::application::use_cases::cancel_order::{
    CancelOrderUseCase, CancelOutcome, CancelSettings,
};
use crate::application::use_cases::create_order::CreateOrderUseCase;
use crate::domain::order_execution::{Order, OrderRepository, OrderStatus};
use crate::domain::shared::OrderId;
use crate::observability;

/// Result of a completed rollover.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloverResult {
    /// Prior order, now `cancelled`.
    pub prior: Order,
    /// Replacement order id.
    pub order_id: OrderId,
}

/// Use case for rolling an order into a replacement.
pub struct RolloverOrderUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    orders: Arc<O>,
    cancel: CancelOrderUseCase<S, O>,
    create: CreateOrderUseCase<O>,
}

impl<S, O> RolloverOrderUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    /// Create a new `RolloverOrderUseCase`.
    pub fn new(session: Arc<S>, orders: Arc<O>, settings: CancelSettings) -> Self {
        Self {
            cancel: CancelOrderUseCase::new(session, Arc::clone(&orders), settings),
            create: CreateOrderUseCase::new(Arc::clone(&orders)),
            orders,
        }
    }

    /// Roll the prior order into the replacement described by the request.
    ///
    /// # Errors
    ///
    /// - `Validation` for a missing prior id or an invalid replacement
    /// - `NotFound` if the prior order does not exist
    /// - `Conflict` if the prior order already completed
    /// - `VenueFailure` if the venue does not confirm the cancel in time
    /// - `PartialRollover` if the prior was cancelled but the replacement
    ///   could not be created
    pub async fn execute(&self, request: RolloverRequestDto) -> Result<RolloverResult, LifecycleError> {
        let result = self.roll(request).await;
        let outcome = match &result {
            Ok(_) => "completed",
            Err(LifecycleError::PartialRollover { .. }) => "partial",
            Err(_) => "failed",
        };
        observability::record_rollover(outcome);
        result
    }

    async fn roll(&self, request: RolloverRequestDto) -> Result<RolloverResult, LifecycleError> {
        let prior_id = request
            .prior_order_id
            .map(OrderId::new)
            .ok_or_else(|| {
                LifecycleError::validation("prior_order_id", "Missing required field: prior_order_id")
            })?;

        // Reject a bad replacement before touching the prior order.
        let mut replacement = request.replacement;
        replacement.is_rollover = true;
        replacement.rolled_from_order_id = Some(prior_id.value());
        let replacement = replacement.into_new_order()?;

        let prior = self
            .orders
            .get(prior_id)
            .await?
            .ok_or_else(|| LifecycleError::order_not_found(prior_id))?;

        let prior = match prior.status {
            OrderStatus::Cancelled => {
                tracing::info!(order_id = %prior_id, "Prior order already cancelled");
                prior
            }
            OrderStatus::Completed => {
                return Err(LifecycleError::conflict(format!(
                    "Order {prior_id} is already completed and cannot be rolled"
                )));
            }
            OrderStatus::Pending | OrderStatus::Processing => {
                match self.cancel.execute(prior_id).await? {
                    CancelOutcome::Cancelled(order) => order,
                    CancelOutcome::Requested(_) => {
                        return Err(LifecycleError::VenueFailure {
                            message: format!(
                                "Cancel of order {prior_id} was not confirmed by the venue; rollover aborted"
                            ),
                        });
                    }
                }
            }
        };

        let order_id = match self.create.create(&replacement).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    prior_order_id = %prior_id,
                    error = %e,
                    "Prior order cancelled but replacement could not be created"
                );
                return Err(LifecycleError::PartialRollover {
                    prior_order_id: prior_id,
                    reason: e.to_string(),
                });
            }
        };

        tracing::info!(
            prior_order_id = %prior_id,
            order_id = %order_id,
            ticker = %replacement.ticker,
            "Order rolled"
        );
        Ok(RolloverResult { prior, order_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::CreateOrderDto;
    use crate::application::use_cases::testing::{FakeSession, FakeStore, aapl_put};
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn settings() -> CancelSettings {
        CancelSettings {
            confirm_timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn replacement() -> CreateOrderDto {
        CreateOrderDto {
            ticker: Some("AAPL".into()),
            option_type: Some("PUT".into()),
            action: Some("SELL".into()),
            strike: Some(dec!(145.0)),
            expiration: Some("20250117".into()),
            premium: Some(dec!(3.10)),
            quantity: Some(1),
            ..CreateOrderDto::default()
        }
    }

    fn request(prior: OrderId) -> RolloverRequestDto {
        RolloverRequestDto {
            prior_order_id: Some(prior.value()),
            replacement: replacement(),
        }
    }

    #[tokio::test]
    async fn rollover_cancels_prior_and_links_replacement() {
        let store = Arc::new(FakeStore::new());
        let prior = store.create(&aapl_put()).await.unwrap();
        let use_case = RolloverOrderUseCase::new(Arc::new(FakeSession::new()), Arc::clone(&store), settings());

        let result = use_case.execute(request(prior)).await.unwrap();

        assert_eq!(result.prior.status, OrderStatus::Cancelled);
        let replacement = store.order(result.order_id).unwrap();
        assert!(replacement.is_rollover);
        assert_eq!(replacement.rolled_from, Some(prior));
        assert_eq!(replacement.status, OrderStatus::Pending);
        assert_eq!(replacement.premium, Some(dec!(3.10)));
    }

    #[tokio::test]
    async fn failed_replacement_is_a_partial_rollover() {
        let store = Arc::new(FakeStore::new());
        for _ in 0..5 {
            store.create(&aapl_put()).await.unwrap();
        }
        let prior = OrderId::new(5);
        store.fail_create.store(true, Ordering::SeqCst);
        let use_case = RolloverOrderUseCase::new(Arc::new(FakeSession::new()), Arc::clone(&store), settings());

        let err = use_case.execute(request(prior)).await.unwrap_err();

        match err {
            LifecycleError::PartialRollover { prior_order_id, .. } => {
                assert_eq!(prior_order_id, prior);
            }
            other => panic!("expected partial rollover, got {other:?}"),
        }
        assert_eq!(store.order(prior).unwrap().status, OrderStatus::Cancelled);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn invalid_replacement_leaves_prior_untouched() {
        let store = Arc::new(FakeStore::new());
        let prior = store.create(&aapl_put()).await.unwrap();
        let use_case = RolloverOrderUseCase::new(Arc::new(FakeSession::new()), Arc::clone(&store), settings());

        let mut bad = request(prior);
        bad.replacement.quantity = Some(0);
        let err = use_case.execute(bad).await.unwrap_err();

        assert!(matches!(err, LifecycleError::Validation { .. }));
        assert_eq!(store.order(prior).unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn missing_prior_is_not_found() {
        let store = Arc::new(FakeStore::new());
        let use_case = RolloverOrderUseCase::new(Arc::new(FakeSession::new()), Arc::clone(&store), settings());

        let err = use_case.execute(request(OrderId::new(42))).await.unwrap_err();

        assert!(matches!(err, LifecycleError::NotFound { .. }));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn completed_prior_cannot_be_rolled() {
        let store = Arc::new(FakeStore::new());
        let prior = store.create(&aapl_put().mock()).await.unwrap();
        let update = store.order(prior).unwrap().mock_fill();
        store.update_status(prior, &update).await.unwrap();
        let use_case = RolloverOrderUseCase::new(Arc::new(FakeSession::new()), Arc::clone(&store), settings());

        let err = use_case.execute(request(prior)).await.unwrap_err();

        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_prior_is_rolled_without_cancel() {
        let store = Arc::new(FakeStore::new());
        let session = Arc::new(FakeSession::new());
        let prior = store.create(&aapl_put()).await.unwrap();
        CancelOrderUseCase::new(Arc::clone(&session), Arc::clone(&store), settings())
            .execute(prior)
            .await
            .unwrap();
        let use_case = RolloverOrderUseCase::new(Arc::clone(&session), Arc::clone(&store), settings());

        let result = use_case.execute(request(prior)).await.unwrap();

        assert_eq!(result.prior.id, prior);
        assert!(session.cancels.lock().is_empty());
        assert_eq!(store.len(), 2);
    }
}
