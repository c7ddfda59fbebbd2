//! Store errors.

use thiserror::Error;

/// Boxed error reported by a backend implementation.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while opening, filling, flushing or closing
/// a trade store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be opened at the given location.
    #[error("failed to open trade database at {location}")]
    Connection {
        /// Location that was being opened.
        location: String,
        #[source]
        source: BackendError,
    },

    /// Schema creation (DDL) failed.
    #[error("failed to create trades schema")]
    Schema(#[source] BackendError),

    /// Insert statement could not be prepared.
    #[error("failed to prepare trade insert statement")]
    Prepare(#[source] BackendError),

    /// Begin or commit of the batch transaction failed.
    #[error("trade batch transaction failed")]
    Transaction(#[source] BackendError),

    /// A single insert failed; the whole batch was rolled back.
    #[error("failed to insert trade {index} of {batch_len}, batch rolled back")]
    Insert {
        /// Position of the failing record in the batch.
        index: usize,
        /// Number of records in the batch.
        batch_len: usize,
        #[source]
        source: BackendError,
    },

    /// Buffer is at capacity and the last flush did not succeed.
    #[error("trades buffer is full ({capacity} pending), flush before adding")]
    BufferFull {
        /// Configured buffer capacity.
        capacity: usize,
    },

    /// Releasing the statement or closing the connection failed.
    #[error("failed to close trade database")]
    Close(#[source] BackendError),

    /// Read query failed.
    #[error("trade query failed")]
    Query(#[source] BackendError),

    /// Store was already closed.
    #[error("trade store is closed")]
    Closed,
}

impl StoreError {
    /// Build a connection error for `location`.
    pub fn connection(location: &str, source: impl Into<BackendError>) -> Self {
        Self::Connection {
            location: location.to_string(),
            source: source.into(),
        }
    }

    /// Whether the error is the backpressure rejection.
    pub const fn is_buffer_full(&self) -> bool {
        matches!(self, Self::BufferFull { .. })
    }
}
