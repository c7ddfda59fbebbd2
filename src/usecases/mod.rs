//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain types with port interfaces to implement
//! the store's workflows.
//!
//! Use cases:
//! - `TradeStore`: Single-owner buffered store (add / flush / close)
//! - `SharedTradeStore`: Thread-safe variant with lock-minimal flushing
//! - `TradeGenerator`: Synthetic trade streams for population and load

pub mod generator;
pub mod shared_store;
pub mod trade_store;

pub use generator::{TradeGenerator, populate, populate_and_close};
pub use shared_store::SharedTradeStore;
pub use trade_store::{DEFAULT_CAPACITY, TradeStore};
