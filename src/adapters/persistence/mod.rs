//! Persistence Adapters - SQLite Trade Storage
//!
//! Implements the `TradeBackend` port on an embedded SQLite file
//! and provides a read-only reader for analysis queries.

pub mod reader;
pub mod sqlite;

pub use reader::{AveragePrice, TradeReader};
pub use sqlite::SqliteBackend;
