//! HTTP/REST API adapter.
//!
//! Inbound adapter implementing the `/api/options` endpoints on top of the
//! application use cases.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
