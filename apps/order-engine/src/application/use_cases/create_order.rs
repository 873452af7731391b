//! Create Order Use Case

use std::sync::Arc;

use crate::application::dto::CreateOrderDto;
use crate::application::errors::LifecycleError;
use crate::domain::order_execution::{NewOrder, OrderRepository};
use crate::domain::shared::OrderId;
use crate::observability;

/// Use case for validating and persisting an order intent as `pending`.
pub struct CreateOrderUseCase<O>
where
    O: OrderRepository,
{
    orders: Arc<O>,
}

impl<O> CreateOrderUseCase<O>
where
    O: OrderRepository,
{
    /// Create a new `CreateOrderUseCase`.
    pub const fn new(orders: Arc<O>) -> Self {
        Self { orders }
    }

    /// Validate a request and store it.
    ///
    /// # Errors
    ///
    /// Returns a validation or invalid-specification error for a bad request,
    /// a validation error if the request carries rollover linkage (only a
    /// rollover sets it), or a storage error.
    pub async fn execute(&self, request: CreateOrderDto) -> Result<OrderId, LifecycleError> {
        if request.is_rollover || request.rolled_from_order_id.is_some() {
            let field = if request.is_rollover {
                "isRollover"
            } else {
                "rolled_from_order_id"
            };
            return Err(LifecycleError::validation(
                field,
                "rollover orders are created by rolling the prior order",
            ));
        }
        let order = request.into_new_order()?;
        self.create(&order).await
    }

    /// Store an already validated intent.
    ///
    /// # Errors
    ///
    /// Returns a validation error or a storage error.
    pub async fn create(&self, order: &NewOrder) -> Result<OrderId, LifecycleError> {
        let id = self.orders.create(order).await?;

        observability::record_order_created(order.instrument.kind().as_str(), order.is_mock);
        tracing::info!(
            order_id = %id,
            ticker = %order.ticker,
            action = %order.action,
            quantity = order.quantity,
            is_mock = order.is_mock,
            is_rollover = order.is_rollover,
            "Order created"
        );

        Ok(id)
    }
}
