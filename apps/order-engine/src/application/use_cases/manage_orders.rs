//! Manage Orders Use Case
//!
//! Queries and the mutations that never touch the venue.

use std::sync::Arc;

use crate::application::dto::UpdateQuantityDto;
use crate::application::errors::LifecycleError;
use crate::domain::order_execution::{
    Order, OrderClaim, OrderError, OrderFilter, OrderRepository, OrderStatus,
};
use crate::domain::shared::OrderId;

/// Use case for reading, resizing and deleting orders.
pub struct ManageOrdersUseCase<O>
where
    O: OrderRepository,
{
    orders: Arc<O>,
}

impl<O> ManageOrdersUseCase<O>
where
    O: OrderRepository,
{
    /// Create a new `ManageOrdersUseCase`.
    pub const fn new(orders: Arc<O>) -> Self {
        Self { orders }
    }

    fn claim(&self, id: OrderId) -> Result<OrderClaim, LifecycleError> {
        self.orders.claims().try_claim(id).ok_or_else(|| {
            LifecycleError::conflict(format!("Order {id} is being submitted or modified"))
        })
    }

    /// Load one order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent, or a storage error.
    pub async fn get(&self, id: OrderId) -> Result<Order, LifecycleError> {
        self.orders
            .get(id)
            .await?
            .ok_or_else(|| LifecycleError::order_not_found(id))
    }

    /// List orders newest-first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, LifecycleError> {
        Ok(self.orders.list(filter).await?)
    }

    /// Orders still in flight, or executed orders when `executed` is true.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn pending_orders(&self, executed: bool) -> Result<Vec<Order>, LifecycleError> {
        self.list(&OrderFilter::pending_view(executed)).await
    }

    /// Change the quantity of a pending order.
    ///
    /// # Errors
    ///
    /// - `Validation` unless the quantity is a positive integer
    /// - `NotFound` if the order does not exist
    /// - `Conflict` if the order has left `pending` or is being submitted
    pub async fn update_quantity(
        &self,
        id: OrderId,
        request: &UpdateQuantityDto,
    ) -> Result<Order, LifecycleError> {
        let quantity = request.validated()?;
        let _claim = self.claim(id)?;

        if !self.orders.update_quantity(id, quantity).await? {
            let order = self.get(id).await?;
            return Err(OrderError::QuantityLocked {
                order_id: id,
                status: order.status,
            }
            .into());
        }

        tracing::info!(order_id = %id, quantity, "Order quantity updated");
        self.get(id).await
    }

    /// Hard-delete an order.
    ///
    /// Orders working at the venue cannot be deleted; cancel them first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `Conflict` if the order is `processing` or being submitted
    pub async fn delete(&self, id: OrderId) -> Result<(), LifecycleError> {
        let _claim = self.claim(id)?;
        let order = self.get(id).await?;
        if order.status == OrderStatus::Processing && !order.is_mock {
            return Err(LifecycleError::conflict(format!(
                "Order {id} is working at the venue; cancel it before deleting"
            )));
        }

        if !self.orders.delete(id).await? {
            return Err(LifecycleError::order_not_found(id));
        }
        tracing::info!(order_id = %id, ticker = %order.ticker, status = %order.status, "Order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::testing::{FakeStore, aapl_put};
    use crate::domain::order_execution::{ExecutionDetails, StatusUpdate};
    use crate::domain::shared::VenueOrderId;

    async fn seeded() -> (Arc<FakeStore>, ManageOrdersUseCase<FakeStore>) {
        let store = Arc::new(FakeStore::new());
        let use_case = ManageOrdersUseCase::new(Arc::clone(&store));
        (store, use_case)
    }

    async fn to_processing(store: &FakeStore, id: OrderId) {
        store
            .update_status(
                id,
                &StatusUpdate::to(OrderStatus::Processing)
                    .executed(false)
                    .with_details(ExecutionDetails::accepted(
                        VenueOrderId::new(format!("V{id}")),
                        "Submitted".into(),
                        1,
                    )),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn quantity_changes_only_while_pending() {
        let (store, use_case) = seeded().await;
        let id = store.create(&aapl_put()).await.unwrap();

        let order = use_case
            .update_quantity(id, &UpdateQuantityDto { quantity: Some(4) })
            .await
            .unwrap();
        assert_eq!(order.quantity, 4);

        to_processing(&store, id).await;
        let err = use_case
            .update_quantity(id, &UpdateQuantityDto { quantity: Some(2) })
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(store.order(id).unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let (store, use_case) = seeded().await;
        let id = store.create(&aapl_put()).await.unwrap();

        let err = use_case
            .update_quantity(id, &UpdateQuantityDto { quantity: Some(0) })
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation { .. }));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (_store, use_case) = seeded().await;
        let id = OrderId::new(99_999);

        assert!(matches!(use_case.get(id).await, Err(LifecycleError::NotFound { .. })));
        assert!(matches!(
            use_case.update_quantity(id, &UpdateQuantityDto { quantity: Some(1) }).await,
            Err(LifecycleError::NotFound { .. })
        ));
        assert!(matches!(use_case.delete(id).await, Err(LifecycleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn processing_orders_cannot_be_deleted() {
        let (store, use_case) = seeded().await;
        let id = store.create(&aapl_put()).await.unwrap();
        to_processing(&store, id).await;

        let err = use_case.delete(id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn order_under_submission_cannot_be_resized_or_deleted() {
        let (store, use_case) = seeded().await;
        let id = store.create(&aapl_put()).await.unwrap();
        let held = store.claims().try_claim(id).unwrap();

        let err = use_case
            .update_quantity(id, &UpdateQuantityDto { quantity: Some(3) })
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        let err = use_case.delete(id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict { .. }));
        assert_eq!(store.order(id).unwrap().quantity, 1);

        drop(held);
        use_case.delete(id).await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn pending_order_is_deleted() {
        let (store, use_case) = seeded().await;
        let id = store.create(&aapl_put()).await.unwrap();

        use_case.delete(id).await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn pending_view_splits_in_flight_from_executed() {
        let (store, use_case) = seeded().await;
        let pending = store.create(&aapl_put()).await.unwrap();
        let filled = store.create(&aapl_put().mock()).await.unwrap();
        let update = store.order(filled).unwrap().mock_fill();
        store.update_status(filled, &update).await.unwrap();

        let in_flight = use_case.pending_orders(false).await.unwrap();
        assert_eq!(in_flight.iter().map(|o| o.id).collect::<Vec<_>>(), vec![pending]);

        let executed = use_case.pending_orders(true).await.unwrap();
        assert_eq!(executed.iter().map(|o| o.id).collect::<Vec<_>>(), vec![filled]);
    }
}
