//! Execution Report Consumer
//!
//! The session pushes execution reports into a bounded queue; a single
//! consumer task drains it and applies each report in arrival order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::use_cases::ApplyExecutionReportUseCase;
use crate::domain::order_execution::{ExecutionReport, OrderRepository};

/// Producer side of the report queue, held by the broker session.
pub type ReportSender = mpsc::Sender<ExecutionReport>;

/// Create the report queue.
#[must_use]
pub fn report_channel(capacity: usize) -> (ReportSender, mpsc::Receiver<ExecutionReport>) {
    mpsc::channel(capacity.max(1))
}

/// Single consumer of the execution report queue.
pub struct ReportConsumer<O>
where
    O: OrderRepository + 'static,
{
    reports: ApplyExecutionReportUseCase<O>,
    rx: mpsc::Receiver<ExecutionReport>,
    shutdown: CancellationToken,
}

impl<O> ReportConsumer<O>
where
    O: OrderRepository + 'static,
{
    /// Create a consumer over the receiving end of the queue.
    pub fn new(
        orders: Arc<O>,
        rx: mpsc::Receiver<ExecutionReport>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reports: ApplyExecutionReportUseCase::new(orders),
            rx,
            shutdown,
        }
    }

    /// Spawn the consumer loop.
    pub fn spawn(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }

    /// Drain reports until shutdown or until every sender is dropped.
    /// Returns the number of reports processed.
    pub async fn run(mut self) -> usize {
        tracing::info!("Execution report consumer started");
        let mut processed = 0usize;

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    tracing::info!(processed, "Execution report consumer shutting down");
                    break;
                }
                report = self.rx.recv() => {
                    let Some(report) = report else {
                        tracing::info!(processed, "Execution report queue closed");
                        break;
                    };
                    // Failures are logged by the use case; the loop keeps going.
                    let _ = self.reports.apply(&report).await;
                    processed += 1;
                }
            }
        }

        processed
    }
}
