//! Shared Trade Store - Thread-safe Buffered Store
//!
//! Same contract as `TradeStore`, callable through `&self` from
//! many threads (HTTP handlers on the blocking pool).
//!
//! Two locks, always taken in the same order (buffer → flusher):
//! - the buffer lock is held only to append, or to swap a full
//!   buffer for a fresh one;
//! - the flusher lock owns the backend. A full batch is handed to it
//!   by value and written after the buffer lock is released, so adds
//!   continue while a batch is in flight. Taking the flusher lock
//!   before releasing the buffer lock keeps batches in fill order.
//!
//! A batch that fails to commit is parked inside the flusher and
//! retried ahead of the next batch. Parked plus buffered trades never
//! exceed twice the capacity; once they reach capacity, `add` rejects
//! with `BufferFull` until a flush succeeds.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::adapters::persistence::sqlite::SqliteBackend;
use crate::domain::buffer::TradeBuffer;
use crate::domain::error::StoreError;
use crate::domain::trade::Trade;
use crate::ports::backend::TradeBackend;
use crate::ports::observer::StoreObserver;

/// Backend plus the batch that failed last time.
struct Flusher<B> {
    /// `None` once closed.
    backend: Option<B>,
    /// Trades from failed flushes, oldest first.
    parked: Vec<Trade>,
    /// Number of committed batches.
    flushes: u64,
}

/// Thread-safe buffered trade store.
pub struct SharedTradeStore<B: TradeBackend> {
    buffer: Mutex<TradeBuffer>,
    flusher: Mutex<Flusher<B>>,
    /// Mirror of `Flusher::parked.len()` readable under the buffer lock.
    parked: AtomicUsize,
    /// Mirror of the buffer length readable under the flusher lock.
    queued: AtomicUsize,
    /// Set under the buffer lock by `close`.
    closed: AtomicBool,
    observer: Option<Arc<dyn StoreObserver>>,
}

impl SharedTradeStore<SqliteBackend> {
    /// Open (or create) the SQLite database at `location`.
    ///
    /// # Errors
    /// `Connection`, `Schema` or `Prepare` if the backend cannot be
    /// brought up.
    pub fn open_sqlite(location: &str, capacity: usize) -> Result<Self, StoreError> {
        Self::open(SqliteBackend::connect(location)?, capacity)
    }
}

impl<B: TradeBackend> SharedTradeStore<B> {
    /// Initialize `backend` (schema + prepared insert) and wrap it.
    ///
    /// # Errors
    /// `Schema` or `Prepare` from the backend.
    pub fn open(mut backend: B, capacity: usize) -> Result<Self, StoreError> {
        backend.ensure_schema()?;
        backend.prepare_insert()?;

        let buffer = TradeBuffer::new(capacity);
        info!(capacity = buffer.capacity(), "Shared trade store opened");

        Ok(Self {
            buffer: Mutex::new(buffer),
            flusher: Mutex::new(Flusher {
                backend: Some(backend),
                parked: Vec::new(),
                flushes: 0,
            }),
            parked: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            observer: None,
        })
    }

    /// Attach a telemetry observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Buffer a trade; a caller that fills the buffer flushes it.
    ///
    /// # Errors
    /// - `Closed` after `close`.
    /// - `BufferFull` while failed trades are pending at capacity.
    /// - The flush error if this call's flush fails; the batch is
    ///   parked for retry.
    pub fn add(&self, trade: Trade) -> Result<(), StoreError> {
        let mut buffer = lock(&self.buffer);
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        let parked = self.parked.load(Ordering::Acquire);
        if buffer.len() + parked >= buffer.capacity() {
            warn!(parked, buffered = buffer.len(), "Trade rejected, buffer full");
            if let Some(observer) = &self.observer {
                observer.add_rejected();
            }
            return Err(StoreError::BufferFull {
                capacity: buffer.capacity(),
            });
        }

        buffer.push(trade)?;
        self.queued.store(buffer.len(), Ordering::Release);
        let pending = buffer.len() + parked;
        if let Some(observer) = &self.observer {
            observer.buffered(pending);
        }
        if pending < buffer.capacity() {
            return Ok(());
        }

        let batch = self.detach(&mut buffer);
        let mut flusher = lock(&self.flusher);
        drop(buffer);
        self.write(&mut flusher, batch)
    }

    /// Commit every pending trade (parked and buffered).
    ///
    /// # Errors
    /// `Closed` after `close`, otherwise the backend error; the
    /// trades are parked for retry.
    pub fn flush(&self) -> Result<(), StoreError> {
        let mut buffer = lock(&self.buffer);
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        let batch = self.detach(&mut buffer);
        let mut flusher = lock(&self.flusher);
        drop(buffer);
        self.write(&mut flusher, batch)
    }

    /// Final flush, then close the backend. Later calls get `Closed`.
    ///
    /// # Errors
    /// `Closed` if already closed; otherwise the close error, or the
    /// final flush error when closing succeeded.
    #[instrument(skip(self))]
    pub fn close(&self) -> Result<(), StoreError> {
        let mut buffer = lock(&self.buffer);
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }

        let batch = self.detach(&mut buffer);
        let mut flusher = lock(&self.flusher);
        drop(buffer);

        let flushed = self.write(&mut flusher, batch);
        if flushed.is_err() {
            warn!(lost = flusher.parked.len(), "Final flush failed, closing anyway");
        }

        let closed = flusher.backend.take().map_or(Ok(()), B::close);
        info!(flushes = flusher.flushes, "Shared trade store closed");
        closed.and(flushed)
    }

    /// Trades not yet committed (buffered plus parked).
    pub fn buffered(&self) -> usize {
        lock(&self.buffer).len() + self.parked.load(Ordering::Acquire)
    }

    /// Number of batches committed so far.
    pub fn flush_count(&self) -> u64 {
        lock(&self.flusher).flushes
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Swap the buffered trades out. Caller holds the buffer lock.
    fn detach(&self, buffer: &mut TradeBuffer) -> Vec<Trade> {
        self.queued.store(0, Ordering::Release);
        buffer.take()
    }

    /// Report parked plus buffered trades to the observer.
    fn report_pending(&self, parked: usize) {
        if let Some(observer) = &self.observer {
            observer.buffered(parked + self.queued.load(Ordering::Acquire));
        }
    }

    fn write(&self, flusher: &mut Flusher<B>, batch: Vec<Trade>) -> Result<(), StoreError> {
        if flusher.parked.is_empty() {
            flusher.parked = batch;
        } else {
            flusher.parked.extend(batch);
        }
        if flusher.parked.is_empty() {
            return Ok(());
        }

        let Some(backend) = flusher.backend.as_mut() else {
            return Err(StoreError::Closed);
        };

        let rows = flusher.parked.len();
        let started = Instant::now();

        if let Err(err) = backend.insert_batch(&flusher.parked) {
            self.parked.store(rows, Ordering::Release);
            warn!(error = %err, rows, "Trade flush failed, batch parked for retry");
            if let Some(observer) = &self.observer {
                observer.flush_failed(rows);
            }
            self.report_pending(rows);
            return Err(err);
        }

        flusher.parked.clear();
        flusher.flushes += 1;
        self.parked.store(0, Ordering::Release);

        let elapsed = started.elapsed();
        debug!(rows, elapsed_us = elapsed.as_micros(), "Trade batch flushed");
        if let Some(observer) = &self.observer {
            observer.flush_succeeded(rows, elapsed);
        }
        self.report_pending(0);
        Ok(())
    }
}

/// Lock ignoring poison: both guarded values stay consistent across
/// a panicking holder (pushes and swaps are single operations).
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::metrics::StoreMetrics;
    use chrono::Utc;

    fn trade(symbol: &str) -> Trade {
        Trade::new(Utc::now(), symbol, 42.0, true)
    }

    #[test]
    fn test_add_and_auto_flush() {
        let store = SharedTradeStore::open(SqliteBackend::in_memory().unwrap(), 2).unwrap();
        store.add(trade("MSFT")).unwrap();
        assert_eq!(store.buffered(), 1);
        store.add(trade("GOOG")).unwrap();
        assert_eq!(store.buffered(), 0);
        assert_eq!(store.flush_count(), 1);
    }

    #[test]
    fn test_operations_after_close_are_rejected() {
        let store = SharedTradeStore::open(SqliteBackend::in_memory().unwrap(), 8).unwrap();
        store.add(trade("AAPL")).unwrap();
        store.close().unwrap();

        assert!(store.is_closed());
        assert_eq!(store.flush_count(), 1);
        assert!(matches!(store.add(trade("NVDA")), Err(StoreError::Closed)));
        assert!(matches!(store.flush(), Err(StoreError::Closed)));
        assert!(matches!(store.close(), Err(StoreError::Closed)));
    }

    #[test]
    fn test_buffered_gauge_drops_after_flush() {
        let metrics = Arc::new(StoreMetrics::new().unwrap());
        let store = SharedTradeStore::open(SqliteBackend::in_memory().unwrap(), 4)
            .unwrap()
            .with_observer(Arc::clone(&metrics) as Arc<dyn StoreObserver>);

        for s in ["MSFT", "GOOG", "AAPL", "NVDA"] {
            store.add(trade(s)).unwrap();
        }
        assert_eq!(store.buffered(), 0);
        assert_eq!(metrics.buffered_trades.get(), 0);

        store.add(trade("TSLA")).unwrap();
        assert_eq!(metrics.buffered_trades.get(), 1);
        store.flush().unwrap();
        assert_eq!(metrics.buffered_trades.get(), 0);

        store.add(trade("AMZN")).unwrap();
        store.close().unwrap();
        assert_eq!(metrics.buffered_trades.get(), 0);
        assert_eq!(metrics.rows_flushed.get(), 6);
    }

    #[test]
    fn test_store_is_sync() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<SharedTradeStore<SqliteBackend>>();
    }
}
