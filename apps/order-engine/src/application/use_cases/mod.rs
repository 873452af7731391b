//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod apply_execution_report;
mod cancel_order;
mod create_order;
mod execute_order;
mod manage_orders;
mod reconcile;
mod rollover_order;
mod scan_otm_options;

#[cfg(test)]
pub(crate) mod testing;

pub use apply_execution_report::{ApplyExecutionReportUseCase, DiscardReason, ReportOutcome};
pub use cancel_order::{CancelOrderUseCase, CancelOutcome, CancelSettings};
pub use create_order::CreateOrderUseCase;
pub use execute_order::ExecuteOrderUseCase;
pub use manage_orders::ManageOrdersUseCase;
pub use reconcile::{ReconcileSummary, ReconcileUseCase};
pub use rollover_order::{RolloverOrderUseCase, RolloverResult};
pub use scan_otm_options::{OtmScan, ScanOtmOptionsUseCase};
