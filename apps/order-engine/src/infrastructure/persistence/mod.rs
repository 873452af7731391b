//! Persistence Adapters
//!
//! Database implementations of repository traits.

mod sqlite;

pub use sqlite::SqliteOrderStore;
