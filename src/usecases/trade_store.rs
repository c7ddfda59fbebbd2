//! Trade Store - Buffered, Transactional Write-through Store
//!
//! Accepts trades one at a time, holds them in a bounded buffer and
//! commits each full buffer as a single backend transaction:
//! - `add`: append; auto-flush when the buffer reaches capacity
//! - `flush`: one transaction for every pending trade, all or nothing
//! - `close`: final flush, then release the backend
//!
//! A failed flush keeps the buffer intact so the caller can retry.
//! While the buffer sits at capacity, `add` rejects new trades with
//! `BufferFull` instead of growing without bound.
//!
//! Single owner: every mutating call takes `&mut self`. See
//! `SharedTradeStore` for the thread-safe variant.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::adapters::persistence::sqlite::SqliteBackend;
use crate::domain::buffer::TradeBuffer;
use crate::domain::error::StoreError;
use crate::domain::trade::Trade;
use crate::ports::backend::TradeBackend;
use crate::ports::observer::StoreObserver;

/// Default number of trades buffered before an automatic flush.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Buffered trade store over a transactional backend.
pub struct TradeStore<B: TradeBackend> {
    /// Backend connection (exclusively owned).
    backend: B,
    /// Pending trades.
    buffer: TradeBuffer,
    /// Optional telemetry sink.
    observer: Option<Arc<dyn StoreObserver>>,
    /// Number of committed batches.
    flushes: u64,
}

impl TradeStore<SqliteBackend> {
    /// Open (or create) the SQLite database at `location`.
    ///
    /// # Errors
    /// `Connection`, `Schema` or `Prepare` if the backend cannot be
    /// brought up. No store is returned in that case.
    pub fn open_sqlite(location: &str, capacity: usize) -> Result<Self, StoreError> {
        Self::open(SqliteBackend::connect(location)?, capacity)
    }
}

impl<B: TradeBackend> TradeStore<B> {
    /// Initialize `backend` (schema + prepared insert) and wrap it.
    ///
    /// # Errors
    /// `Schema` or `Prepare` from the backend.
    pub fn open(mut backend: B, capacity: usize) -> Result<Self, StoreError> {
        backend.ensure_schema()?;
        backend.prepare_insert()?;

        let buffer = TradeBuffer::new(capacity);
        info!(capacity = buffer.capacity(), "Trade store opened");

        Ok(Self {
            backend,
            buffer,
            observer: None,
            flushes: 0,
        })
    }

    /// Attach a telemetry observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Buffer a trade, flushing when the buffer becomes full.
    ///
    /// # Errors
    /// - `BufferFull` if a previous flush failed and the buffer is
    ///   still at capacity; the trade is not stored.
    /// - The flush error if the automatic flush fails. The trade stays
    ///   buffered, so the failure means the batch did not persist,
    ///   not only this trade.
    pub fn add(&mut self, trade: Trade) -> Result<(), StoreError> {
        let full = match self.buffer.push(trade) {
            Ok(full) => full,
            Err(err) => {
                warn!(capacity = self.buffer.capacity(), "Trade rejected, buffer full");
                if let Some(observer) = &self.observer {
                    observer.add_rejected();
                }
                return Err(err);
            }
        };

        if let Some(observer) = &self.observer {
            observer.buffered(self.buffer.len());
        }

        if full {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit all pending trades in one transaction.
    ///
    /// An empty buffer is a no-op.
    ///
    /// # Errors
    /// `Transaction`, `Prepare` or `Insert` from the backend. Nothing
    /// is committed and the buffer is left unchanged.
    #[instrument(skip(self), fields(rows = self.buffer.len()))]
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let rows = self.buffer.len();
        let started = Instant::now();

        if let Err(err) = self.backend.insert_batch(self.buffer.as_slice()) {
            warn!(error = %err, rows, "Trade flush failed, batch kept for retry");
            if let Some(observer) = &self.observer {
                observer.flush_failed(rows);
            }
            return Err(err);
        }

        self.buffer.clear();
        self.flushes += 1;

        let elapsed = started.elapsed();
        debug!(rows, elapsed_us = elapsed.as_micros(), "Trade batch flushed");
        if let Some(observer) = &self.observer {
            observer.flush_succeeded(rows, elapsed);
            observer.buffered(0);
        }
        Ok(())
    }

    /// Flush remaining trades and close the backend.
    ///
    /// The backend is closed even when the final flush fails.
    ///
    /// # Errors
    /// The close error if closing fails, otherwise the flush error.
    #[instrument(skip(self))]
    pub fn close(mut self) -> Result<(), StoreError> {
        let flushed = self.flush();
        if flushed.is_err() {
            warn!(lost = self.buffer.len(), "Final flush failed, closing anyway");
        }

        let closed = self.backend.close();
        info!(flushes = self.flushes, "Trade store closed");
        closed.and(flushed)
    }

    /// Number of trades waiting for a flush.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Configured buffer capacity.
    pub const fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Number of batches committed so far.
    pub const fn flush_count(&self) -> u64 {
        self.flushes
    }
}
