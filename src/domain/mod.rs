//! Domain layer - Trade records, the pending-trade buffer and errors.
//!
//! No I/O here (hexagonal architecture inner ring). Everything in
//! this module is testable in isolation.

pub mod buffer;
pub mod error;
pub mod trade;

// Re-export core types for convenience
pub use buffer::TradeBuffer;
pub use error::{BackendError, StoreError};
pub use trade::{Trade, TradeValidationError};
