//! Backend Port - Transactional Trade Persistence Interface
//!
//! Defines the trait the buffered stores require from a relational
//! engine: idempotent schema creation, a reusable prepared insert,
//! all-or-nothing batch insertion and a single close.
//!
//! Opening by location is the adapter's constructor, so a value of
//! a `TradeBackend` type is always a live connection.

use crate::domain::error::StoreError;
use crate::domain::trade::Trade;

/// Column-ordered insert used by every SQL backend.
///
/// Values are always bound to the four positional placeholders,
/// never interpolated into the statement text.
pub const INSERT_SQL: &str = "
INSERT INTO trades (
  time, symbol, price, buy
) VALUES (
  ?1, ?2, ?3, ?4
)
";

/// Idempotent schema: the `trades` table plus time and symbol indexes.
pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS trades (
  time TIMESTAMP,
  symbol VARCHAR(32),
  price FLOAT,
  buy BOOLEAN
);

CREATE INDEX IF NOT EXISTS trades_time ON trades(time);
CREATE INDEX IF NOT EXISTS trades_symbol ON trades(symbol);
";

/// Trait for transactional trade persistence providers.
///
/// Calls are synchronous and may block on I/O. Async callers must
/// move them onto a blocking thread.
pub trait TradeBackend: Send {
  /// Create the `trades` table and its indexes if absent.
  ///
  /// Must be safe to run against an already initialized location.
  fn ensure_schema(&mut self) -> Result<(), StoreError>;

  /// Prepare the reusable insert statement.
  fn prepare_insert(&mut self) -> Result<(), StoreError>;

  /// Insert `trades` in order inside a single transaction.
  ///
  /// Either every record is committed or, on the first failing
  /// insert, the transaction is rolled back and nothing is.
  fn insert_batch(&mut self, trades: &[Trade]) -> Result<(), StoreError>;

  /// Release the prepared statement and close the connection.
  ///
  /// Both release paths are attempted even if one fails; the last
  /// failure is reported.
  fn close(self) -> Result<(), StoreError>;
}
