//! Trade Reader - Read-only Queries over the Trades Table
//!
//! Opens the database read-only and answers the analysis
//! questions asked of a trades file: how many rows, what was
//! stored (in insertion order), what fell in a time window, and the
//! average price per symbol and direction.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row, params};
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::error::StoreError;
use crate::domain::trade::Trade;

const SELECT_ALL_SQL: &str = "SELECT time, symbol, price, buy FROM trades ORDER BY rowid";

const SELECT_RANGE_SQL: &str = "
SELECT time, symbol, price, buy FROM trades
WHERE time >= ?1 AND time <= ?2
ORDER BY rowid
";

const AVERAGE_PRICE_SQL: &str = "
SELECT symbol, buy, AVG(price) FROM trades
WHERE time >= ?1 AND time <= ?2
GROUP BY symbol, buy
ORDER BY symbol, buy
";

/// Mean price for one `(symbol, direction)` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AveragePrice {
    /// Ticker symbol.
    pub symbol: String,
    /// Direction of the grouped trades.
    pub buy: bool,
    /// Mean price.
    pub price: f64,
}

/// Read-only view of a trades database.
pub struct TradeReader {
    conn: Connection,
}

impl TradeReader {
    /// Open an existing trades database for reading.
    ///
    /// # Errors
    /// `StoreError::Connection` if the file does not exist or cannot
    /// be opened.
    pub fn open(location: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            location,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::connection(location, e))?;
        Ok(Self { conn })
    }

    /// Number of stored trades.
    ///
    /// # Errors
    /// `StoreError::Query` on SQLite failure.
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trades", [], |r| r.get(0))
            .map_err(query_error)?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    /// Every stored trade in insertion (rowid) order.
    ///
    /// # Errors
    /// `StoreError::Query` on SQLite failure.
    pub fn load_all(&self) -> Result<Vec<Trade>, StoreError> {
        let mut stmt = self.conn.prepare(SELECT_ALL_SQL).map_err(query_error)?;
        let rows = stmt.query_map([], trade_from_row).map_err(query_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    /// Trades with `start <= time <= end`, in insertion order.
    ///
    /// # Errors
    /// `StoreError::Query` on SQLite failure.
    #[instrument(skip(self))]
    pub fn load_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Trade>, StoreError> {
        let mut stmt = self.conn.prepare(SELECT_RANGE_SQL).map_err(query_error)?;
        let rows = stmt
            .query_map(params![start, end], trade_from_row)
            .map_err(query_error)?;
        let trades = rows.collect::<Result<Vec<_>, _>>().map_err(query_error)?;
        info!(count = trades.len(), "Loaded trades in range");
        Ok(trades)
    }

    /// Mean price grouped by `(symbol, buy)` for trades in the window.
    ///
    /// Sorted by symbol, sells before buys.
    ///
    /// # Errors
    /// `StoreError::Query` on SQLite failure.
    #[instrument(skip(self))]
    pub fn average_prices(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AveragePrice>, StoreError> {
        let mut stmt = self.conn.prepare(AVERAGE_PRICE_SQL).map_err(query_error)?;
        let rows = stmt
            .query_map(params![start, end], |row| {
                Ok(AveragePrice {
                    symbol: row.get(0)?,
                    buy: row.get(1)?,
                    price: row.get(2)?,
                })
            })
            .map_err(query_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        time: row.get(0)?,
        symbol: row.get(1)?,
        price: row.get(2)?,
        is_buy: row.get(3)?,
    })
}

fn query_error(e: rusqlite::Error) -> StoreError {
    StoreError::Query(e.into())
}
