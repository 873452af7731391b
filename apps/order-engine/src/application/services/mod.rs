//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters.
//! They differ from use cases in that they run as background tasks.

mod reconciler;
mod report_consumer;

pub use reconciler::spawn_reconciler;
pub use report_consumer::{ReportConsumer, ReportSender, report_channel};
