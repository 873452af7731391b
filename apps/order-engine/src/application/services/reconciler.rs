//! Reconciliation trigger.
//!
//! Runs reconciliation once at startup (when enabled) and again every time
//! the session supervisor reports a successful reconnect.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::BrokerSession;
use crate::application::use_cases::ReconcileUseCase;
use crate::domain::order_execution::OrderRepository;

/// Spawn the reconciliation task.
///
/// `reconnects` is a counter bumped by the supervisor after each reconnect.
pub fn spawn_reconciler<S, O>(
    use_case: Arc<ReconcileUseCase<S, O>>,
    mut reconnects: watch::Receiver<u64>,
    on_startup: bool,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: BrokerSession + 'static,
    O: OrderRepository + 'static,
{
    tokio::spawn(async move {
        if on_startup {
            run_once(&use_case, "startup").await;
        }

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = reconnects.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let generation = *reconnects.borrow_and_update();
                    tracing::info!(generation, "Session reconnected, reconciling");
                    run_once(&use_case, "reconnect").await;
                }
            }
        }
    })
}

async fn run_once<S, O>(use_case: &ReconcileUseCase<S, O>, trigger: &'static str)
where
    S: BrokerSession,
    O: OrderRepository,
{
    match use_case.execute().await {
        Ok(summary) if !summary.is_success() => {
            tracing::warn!(trigger, failed = summary.failed, errors = ?summary.errors, "Reconciliation incomplete");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(trigger, error = %e, "Reconciliation skipped"),
    }
}
