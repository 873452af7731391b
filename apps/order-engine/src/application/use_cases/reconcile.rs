//! Reconcile Use Case
//!
//! Re-derives venue state for orders left `processing`, after a restart or a
//! reconnect, by polling the session and applying what it reports through
//! the same idempotent path as pushed reports.

use std::sync::Arc;

use crate::application::errors::LifecycleError;
use crate::application::ports::BrokerSession;
use crate::application::use_cases::apply_execution_report::{
    ApplyExecutionReportUseCase, ReportOutcome,
};
use crate::domain::order_execution::{OrderFilter, OrderRepository, OrderStatus};
use crate::observability;

/// Overall reconciliation result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Processing orders with a venue order id.
    pub checked: usize,
    /// Reports that changed a stored order.
    pub applied: usize,
    /// Reports that were no-ops, or orders the venue had no report for.
    pub discarded: usize,
    /// Orders whose status could not be fetched or applied.
    pub failed: usize,
    /// Error messages for the failures.
    pub errors: Vec<String>,
}

impl ReconcileSummary {
    /// Check if reconciliation was fully successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Use case for reconciling local order state with the venue.
pub struct ReconcileUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    session: Arc<S>,
    orders: Arc<O>,
    reports: ApplyExecutionReportUseCase<O>,
}

impl<S, O> ReconcileUseCase<S, O>
where
    S: BrokerSession,
    O: OrderRepository,
{
    /// Create a new `ReconcileUseCase`.
    pub fn new(session: Arc<S>, orders: Arc<O>) -> Self {
        Self {
            session,
            reports: ApplyExecutionReportUseCase::new(Arc::clone(&orders)),
            orders,
        }
    }

    /// Reconcile every processing order.
    ///
    /// Per-order failures are collected in the summary rather than aborting
    /// the run.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if the session cannot connect, or a storage
    /// error if processing orders cannot be listed.
    pub async fn execute(&self) -> Result<ReconcileSummary, LifecycleError> {
        let processing = self
            .orders
            .list(&OrderFilter::all().with_status(OrderStatus::Processing))
            .await?;

        let mut summary = ReconcileSummary::default();
        let candidates: Vec<_> = processing
            .into_iter()
            .filter(|o| !o.is_mock)
            .filter_map(|o| o.execution.venue_order_id.clone().map(|v| (o.id, v)))
            .collect();
        if candidates.is_empty() {
            tracing::debug!("No processing orders to reconcile");
            return Ok(summary);
        }

        if !self.session.connect().await {
            return Err(LifecycleError::NotConnected);
        }

        for (order_id, venue_order_id) in candidates {
            summary.checked += 1;

            let report = match self.session.order_status(&venue_order_id).await {
                Ok(Some(report)) => report,
                Ok(None) => {
                    tracing::warn!(
                        order_id = %order_id,
                        venue_order_id = %venue_order_id,
                        "Venue has no record of processing order"
                    );
                    summary.discarded += 1;
                    continue;
                }
                Err(e) => {
                    summary.failed += 1;
                    summary
                        .errors
                        .push(format!("Failed to fetch status of order {order_id}: {e}"));
                    continue;
                }
            };

            match self.reports.apply(&report).await {
                Ok(ReportOutcome::Applied { .. }) => summary.applied += 1,
                Ok(ReportOutcome::Discarded(_)) => summary.discarded += 1,
                Err(e) => {
                    summary.failed += 1;
                    summary
                        .errors
                        .push(format!("Failed to reconcile order {order_id}: {e}"));
                }
            }
        }

        observability::record_reconciliation(summary.checked, summary.applied, summary.failed);
        tracing::info!(
            checked = summary.checked,
            applied = summary.applied,
            discarded = summary.discarded,
            failed = summary.failed,
            "Reconciliation finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::execute_order::ExecuteOrderUseCase;
    use crate::application::use_cases::testing::{FakeSession, FakeStore, aapl_put};
    use crate::domain::order_execution::ExecutionReport;
    use crate::domain::shared::VenueOrderId;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn fills_missed_while_down_are_applied() {
        let store = Arc::new(FakeStore::new());
        let session = Arc::new(FakeSession::new());
        let id = store.create(&aapl_put()).await.unwrap();
        ExecuteOrderUseCase::new(Arc::clone(&session), Arc::clone(&store))
            .execute(id)
            .await
            .unwrap();
        session.set_report(
            ExecutionReport::new(VenueOrderId::new("V1"), "Filled", 1, 0)
                .with_avg_fill_price(dec!(2.45)),
        );

        let use_case = ReconcileUseCase::new(Arc::clone(&session), Arc::clone(&store));
        let summary = use_case.execute().await.unwrap();

        assert_eq!(summary.checked, 1);
        assert_eq!(summary.applied, 1);
        assert!(summary.is_success());
        let order = store.order(id).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.execution.avg_fill_price, Some(dec!(2.45)));

        let again = use_case.execute().await.unwrap();
        assert_eq!(again.checked, 0);
    }

    #[tokio::test]
    async fn pending_orders_are_not_checked() {
        let store = Arc::new(FakeStore::new());
        store.create(&aapl_put()).await.unwrap();
        let session = Arc::new(FakeSession::offline());

        let summary = ReconcileUseCase::new(session, Arc::clone(&store))
            .execute()
            .await
            .unwrap();
        assert_eq!(summary, ReconcileSummary::default());
    }

    #[tokio::test]
    async fn unknown_venue_order_is_counted_as_discarded() {
        let store = Arc::new(FakeStore::new());
        let session = Arc::new(FakeSession::new());
        let id = store.create(&aapl_put()).await.unwrap();
        ExecuteOrderUseCase::new(Arc::clone(&session), Arc::clone(&store))
            .execute(id)
            .await
            .unwrap();
        session.reports.lock().clear();

        let summary = ReconcileUseCase::new(Arc::clone(&session), Arc::clone(&store))
            .execute()
            .await
            .unwrap();

        assert_eq!(summary.checked, 1);
        assert_eq!(summary.discarded, 1);
        assert_eq!(store.order(id).unwrap().status, OrderStatus::Processing);
    }
}
