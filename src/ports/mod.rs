//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `TradeBackend`: Transactional batch persistence (SQLite)
//! - `StoreObserver`: Flush and buffer telemetry (Prometheus)

pub mod backend;
pub mod observer;

pub use backend::TradeBackend;
pub use observer::StoreObserver;
