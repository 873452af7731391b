//! Infrastructure Layer
//!
//! Adapters for the ports defined in the domain and application layers:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: SQLite order and recommendation store
//!   - `session/`: broker session over a venue client, paper venue
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST API controllers

pub mod http;
pub mod persistence;
pub mod session;
