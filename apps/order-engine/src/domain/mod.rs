//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless business logic
//! - **Repository Traits**: Persistence abstractions (implemented in adapters)
//!
//! # Bounded Contexts
//!
//! - [`order_execution`]: Order lifecycle and execution-report application
//! - [`market_calendar`]: Trading hours, expirations and strike ladders
//! - [`recommendation`]: Advisory option candidates

pub mod market_calendar;
pub mod order_execution;
pub mod recommendation;
pub mod shared;
