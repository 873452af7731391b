//! Apply Execution Report Use Case
//!
//! The single path by which venue-side progress reaches the store. Reports
//! for unknown or terminal orders are no-ops, so redelivery is harmless.

use std::sync::Arc;

use crate::application::errors::LifecycleError;
use crate::domain::order_execution::{
    ExecutionReport, OrderError, OrderRepository, OrderStatus, StoreError,
};
use crate::domain::shared::OrderId;
use crate::observability;

/// Why a report was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No stored order carries the venue order id.
    UnknownOrder,
    /// The order already reached a terminal status.
    AlreadyTerminal,
}

/// Result of applying one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The store was updated.
    Applied {
        /// Local order.
        order_id: OrderId,
        /// Status after the update.
        status: OrderStatus,
    },
    /// Nothing changed.
    Discarded(DiscardReason),
}

/// Use case for applying execution reports onto stored orders.
pub struct ApplyExecutionReportUseCase<O>
where
    O: OrderRepository,
{
    orders: Arc<O>,
}

impl<O> ApplyExecutionReportUseCase<O>
where
    O: OrderRepository,
{
    /// Create a new `ApplyExecutionReportUseCase`.
    pub const fn new(orders: Arc<O>) -> Self {
        Self { orders }
    }

    /// Apply a report.
    ///
    /// # Errors
    ///
    /// Returns an error for reports whose quantities do not balance against
    /// the order, or for storage failures.
    pub async fn apply(&self, report: &ExecutionReport) -> Result<ReportOutcome, LifecycleError> {
        let result = self.apply_inner(report).await;
        match &result {
            Ok(ReportOutcome::Applied { order_id, status }) => {
                observability::record_execution_report("applied");
                tracing::info!(
                    order_id = %order_id,
                    venue_order_id = %report.venue_order_id,
                    venue_status = %report.venue_status,
                    filled = report.filled,
                    remaining = report.remaining,
                    status = %status,
                    "Execution report applied"
                );
            }
            Ok(ReportOutcome::Discarded(reason)) => {
                observability::record_execution_report("discarded");
                tracing::debug!(
                    venue_order_id = %report.venue_order_id,
                    venue_status = %report.venue_status,
                    reason = ?reason,
                    "Execution report discarded"
                );
            }
            Err(e) => {
                observability::record_execution_report("error");
                tracing::error!(
                    venue_order_id = %report.venue_order_id,
                    error = %e,
                    "Failed to apply execution report"
                );
            }
        }
        result
    }

    async fn apply_inner(&self, report: &ExecutionReport) -> Result<ReportOutcome, LifecycleError> {
        let Some(order) = self
            .orders
            .get_by_venue_order_id(&report.venue_order_id)
            .await?
        else {
            return Ok(ReportOutcome::Discarded(DiscardReason::UnknownOrder));
        };

        if order.status.is_terminal() {
            return Ok(ReportOutcome::Discarded(DiscardReason::AlreadyTerminal));
        }

        let update = match order.apply_report(report) {
            Ok(update) => update,
            Err(OrderError::InvalidStateTransition { .. }) => {
                return Ok(ReportOutcome::Discarded(DiscardReason::AlreadyTerminal));
            }
            Err(e) => return Err(e.into()),
        };

        match self.orders.update_status(order.id, &update).await {
            Ok(true) => Ok(ReportOutcome::Applied {
                order_id: order.id,
                status: update.status,
            }),
            // Deleted between read and write
            Ok(false) => Ok(ReportOutcome::Discarded(DiscardReason::UnknownOrder)),
            // Reached a terminal status between read and write
            Err(StoreError::Order(OrderError::InvalidStateTransition { .. })) => {
                Ok(ReportOutcome::Discarded(DiscardReason::AlreadyTerminal))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::testing::{FakeStore, aapl_put};
    use crate::domain::order_execution::{ExecutionDetails, StatusUpdate};
    use crate::domain::shared::VenueOrderId;
    use rust_decimal_macros::dec;

    async fn processing_order(store: &FakeStore, quantity: u32) -> OrderId {
        let mut order = aapl_put();
        order.quantity = quantity;
        let id = store.create(&order).await.unwrap();
        store
            .update_status(
                id,
                &StatusUpdate::to(OrderStatus::Processing)
                    .executed(false)
                    .with_details(ExecutionDetails::accepted(
                        VenueOrderId::new("V1"),
                        "Submitted".into(),
                        quantity,
                    )),
            )
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn filled_report_completes_order() {
        let store = Arc::new(FakeStore::new());
        let id = processing_order(&store, 1).await;
        let use_case = ApplyExecutionReportUseCase::new(Arc::clone(&store));

        let report = ExecutionReport::new(VenueOrderId::new("V1"), "Filled", 1, 0)
            .with_avg_fill_price(dec!(2.50));
        let outcome = use_case.apply(&report).await.unwrap();

        assert_eq!(
            outcome,
            ReportOutcome::Applied {
                order_id: id,
                status: OrderStatus::Completed
            }
        );
        let order = store.order(id).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.executed);
        assert_eq!(order.execution.filled, Some(1));
        assert_eq!(order.execution.remaining, Some(0));
        assert_eq!(order.execution.avg_fill_price, Some(dec!(2.50)));
        assert_eq!(order.execution.venue_order_id, Some(VenueOrderId::new("V1")));
    }

    #[tokio::test]
    async fn redelivered_terminal_report_is_noop() {
        let store = Arc::new(FakeStore::new());
        let id = processing_order(&store, 1).await;
        let use_case = ApplyExecutionReportUseCase::new(Arc::clone(&store));

        let report = ExecutionReport::new(VenueOrderId::new("V1"), "Filled", 1, 0);
        use_case.apply(&report).await.unwrap();
        let before = store.order(id).unwrap();

        let outcome = use_case.apply(&report).await.unwrap();
        assert_eq!(outcome, ReportOutcome::Discarded(DiscardReason::AlreadyTerminal));
        assert_eq!(store.order(id).unwrap(), before);
    }

    #[tokio::test]
    async fn late_cancel_after_fill_is_noop() {
        let store = Arc::new(FakeStore::new());
        let id = processing_order(&store, 1).await;
        let use_case = ApplyExecutionReportUseCase::new(Arc::clone(&store));

        use_case
            .apply(&ExecutionReport::new(VenueOrderId::new("V1"), "Filled", 1, 0))
            .await
            .unwrap();
        let outcome = use_case
            .apply(&ExecutionReport::new(VenueOrderId::new("V1"), "Cancelled", 1, 0))
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Discarded(DiscardReason::AlreadyTerminal));
        assert_eq!(store.order(id).unwrap().status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_venue_order_is_discarded() {
        let store = Arc::new(FakeStore::new());
        let use_case = ApplyExecutionReportUseCase::new(Arc::clone(&store));

        let outcome = use_case
            .apply(&ExecutionReport::new(VenueOrderId::new("V404"), "Filled", 1, 0))
            .await
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Discarded(DiscardReason::UnknownOrder));
    }

    #[tokio::test]
    async fn partial_fill_then_cancel_keeps_fill_audit() {
        let store = Arc::new(FakeStore::new());
        let id = processing_order(&store, 3).await;
        let use_case = ApplyExecutionReportUseCase::new(Arc::clone(&store));

        use_case
            .apply(
                &ExecutionReport::new(VenueOrderId::new("V1"), "PreSubmitted", 1, 2)
                    .with_avg_fill_price(dec!(2.40)),
            )
            .await
            .unwrap();
        let order = store.order(id).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.executed);

        use_case
            .apply(
                &ExecutionReport::new(VenueOrderId::new("V1"), "Cancelled", 1, 2)
                    .with_avg_fill_price(dec!(2.40)),
            )
            .await
            .unwrap();
        let order = store.order(id).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.executed);
        assert_eq!(order.execution.filled, Some(1));
        assert_eq!(order.execution.remaining, Some(2));
    }

    #[tokio::test]
    async fn unbalanced_report_is_an_error_and_changes_nothing() {
        let store = Arc::new(FakeStore::new());
        let id = processing_order(&store, 2).await;
        let use_case = ApplyExecutionReportUseCase::new(Arc::clone(&store));

        let err = use_case
            .apply(&ExecutionReport::new(VenueOrderId::new("V1"), "Submitted", 5, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::VenueFailure { .. }));
        assert_eq!(store.order(id).unwrap().status, OrderStatus::Processing);
    }
}
