//! SQLite Backend - Transactional Trade Inserts via rusqlite
//!
//! Implements the `TradeBackend` port on a single `rusqlite`
//! connection. The insert statement lives in the connection's
//! prepared-statement cache, so it is compiled once at open and
//! reused by every batch transaction.

use std::time::Duration;

use rusqlite::{Connection, Transaction, params};
use tracing::{debug, info, instrument, warn};

use crate::domain::error::StoreError;
use crate::domain::trade::Trade;
use crate::ports::backend::{INSERT_SQL, SCHEMA_SQL, TradeBackend};

/// Default SQLite busy timeout.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed trade persistence.
pub struct SqliteBackend {
    /// Open connection (exclusively owned).
    conn: Connection,
    /// Location the connection was opened with.
    location: String,
}

impl SqliteBackend {
    /// Open (or create) the database file at `location`.
    ///
    /// # Errors
    /// `StoreError::Connection` if the file cannot be opened.
    pub fn connect(location: &str) -> Result<Self, StoreError> {
        Self::connect_with_timeout(location, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open `location` with an explicit busy timeout.
    ///
    /// # Errors
    /// `StoreError::Connection` if the file cannot be opened or the
    /// timeout cannot be applied.
    pub fn connect_with_timeout(
        location: &str,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(location)
            .map_err(|e| StoreError::connection(location, e))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| StoreError::connection(location, e))?;

        info!(location, "Connected to trade database");
        Ok(Self {
            conn,
            location: location.to_string(),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// `StoreError::Connection` if SQLite cannot allocate it.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::connection(":memory:", e))?;
        Ok(Self {
            conn,
            location: ":memory:".to_string(),
        })
    }

    /// Location this backend was opened with.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn insert_all(tx: &Transaction<'_>, trades: &[Trade]) -> Result<(), StoreError> {
        let mut stmt = tx
            .prepare_cached(INSERT_SQL)
            .map_err(|e| StoreError::Prepare(e.into()))?;

        for (index, trade) in trades.iter().enumerate() {
            stmt.execute(params![trade.time, trade.symbol, trade.price, trade.is_buy])
                .map_err(|e| StoreError::Insert {
                    index,
                    batch_len: trades.len(),
                    source: e.into(),
                })?;
        }
        Ok(())
    }
}

impl TradeBackend for SqliteBackend {
    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::Schema(e.into()))
    }

    fn prepare_insert(&mut self) -> Result<(), StoreError> {
        self.conn
            .prepare_cached(INSERT_SQL)
            .map(|_| ())
            .map_err(|e| StoreError::Prepare(e.into()))
    }

    #[instrument(skip(self, trades), fields(rows = trades.len()))]
    fn insert_batch(&mut self, trades: &[Trade]) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StoreError::Transaction(e.into()))?;

        if let Err(err) = Self::insert_all(&tx, trades) {
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "Rollback of trade batch failed");
            }
            return Err(err);
        }

        tx.commit().map_err(|e| StoreError::Transaction(e.into()))?;
        debug!("Trade batch committed");
        Ok(())
    }

    #[instrument(skip(self), fields(location = %self.location))]
    fn close(self) -> Result<(), StoreError> {
        // Finalizes the cached insert statement.
        self.conn.flush_prepared_statement_cache();

        match self.conn.close() {
            Ok(()) => {
                info!("Trade database closed");
                Ok(())
            }
            Err((_conn, e)) => Err(StoreError::Close(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn trade(symbol: &str, secs: u32) -> Trade {
        Trade::new(
            Utc.with_ymd_and_hms(2020, 7, 2, 0, 0, secs).unwrap(),
            symbol,
            100.0 + f64::from(secs),
            secs % 2 == 0,
        )
    }

    fn row_count(backend: &SqliteBackend) -> i64 {
        backend
            .conn
            .query_row("SELECT COUNT(*) FROM trades", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_schema_is_idempotent() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        backend.ensure_schema().unwrap();
        backend.ensure_schema().unwrap();

        let indexes: i64 = backend
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'trades'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 2);
    }

    #[test]
    fn test_prepare_before_schema_fails() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        let err = backend.prepare_insert().unwrap_err();
        assert!(matches!(err, StoreError::Prepare(_)));
    }

    #[test]
    fn test_batch_insert_commits_all_rows() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        backend.ensure_schema().unwrap();
        backend.prepare_insert().unwrap();

        let batch: Vec<_> = (0..5).map(|i| trade("AAPL", i)).collect();
        backend.insert_batch(&batch).unwrap();
        assert_eq!(row_count(&backend), 5);
    }

    #[test]
    fn test_failing_insert_rolls_back_batch() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        backend.ensure_schema().unwrap();
        backend
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON trades
                 WHEN NEW.symbol = 'BAD'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        backend.prepare_insert().unwrap();

        let batch = vec![trade("MSFT", 1), trade("BAD", 2), trade("NVDA", 3)];
        let err = backend.insert_batch(&batch).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Insert {
                index: 1,
                batch_len: 3,
                ..
            }
        ));
        assert_eq!(row_count(&backend), 0);
    }

    #[test]
    fn test_connect_to_missing_directory_fails() {
        let err = SqliteBackend::connect("/nonexistent-dir/sub/trades.db")
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Connection { .. }));
    }

    #[test]
    fn test_location_is_recorded() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(SqliteBackend::connect(path).unwrap().location(), path);
        assert_eq!(SqliteBackend::in_memory().unwrap().location(), ":memory:");
    }

    #[test]
    fn test_close_succeeds() {
        let mut backend = SqliteBackend::in_memory().unwrap();
        backend.ensure_schema().unwrap();
        backend.prepare_insert().unwrap();
        assert!(backend.close().is_ok());
    }
}
