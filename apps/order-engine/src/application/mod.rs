//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for interacting with external systems
//! - **Use Cases**: Order lifecycle operations
//! - **Services**: Background tasks draining reports and reconciling
//! - **DTOs**: Data transfer objects for API boundaries

pub mod dto;
pub mod errors;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use dto::*;
pub use errors::LifecycleError;
pub use ports::*;
pub use services::*;
pub use use_cases::*;
