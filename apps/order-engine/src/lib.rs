// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Engine - Options Order Lifecycle Library
//!
//! Owns option and equity orders from intent to a terminal state against a
//! single stateful broker session.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `order_execution`: Order aggregate, status state machine, execution reports
//!   - `market_calendar`: Trading hours, expirations, strike ladders
//!   - `recommendation`: Advisory option candidates
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `BrokerSession`
//!   - `use_cases`: `CreateOrder`, `ExecuteOrder`, `CancelOrder`, `RolloverOrder`,
//!     `ManageOrders`, `ApplyExecutionReport`, `Reconcile`
//!   - `services`: report consumer and reconciliation trigger
//!
//! - **Infrastructure**: Adapters
//!   - `persistence`: SQLite order and recommendation store
//!   - `session`: managed broker session, paper venue, keepalive supervisor
//!   - `http`: axum REST API

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration with environment interpolation.
pub mod config;

/// Structured HTTP errors.
pub mod error;

/// Metrics and logging.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use domain::order_execution::{
    ExecutionReport, Instrument, NewOrder, Order, OrderFilter, OrderRepository, OrderSide,
    OrderStatus, OrderType,
};
pub use domain::shared::{OrderId, VenueOrderId};

pub use application::LifecycleError;
pub use application::ports::{BrokerError, BrokerSession};

pub use config::{Config, ConfigError, load_config};
pub use error::{EngineError, ErrorCode, HttpErrorResponse};

pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::persistence::SqliteOrderStore;
pub use infrastructure::session::{ManagedSession, PaperVenue, SessionSupervisor};
