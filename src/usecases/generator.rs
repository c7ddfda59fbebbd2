//! Trade Generator - Synthetic Trade Streams
//!
//! Produces evenly spaced trades over a fixed symbol set, used to
//! populate databases for analysis, load tests and benchmarks.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::domain::error::StoreError;
use crate::domain::trade::Trade;
use crate::ports::backend::TradeBackend;
use crate::usecases::trade_store::TradeStore;

/// Symbols drawn by default.
pub const DEFAULT_SYMBOLS: [&str; 4] = ["MSFT", "GOOG", "AAPL", "NVDA"];

/// Upper bound (exclusive) for generated prices.
pub const MAX_PRICE: f64 = 500.0;

/// Infinite iterator of synthetic trades.
pub struct TradeGenerator {
    rng: StdRng,
    symbols: Vec<String>,
    next_time: DateTime<Utc>,
    delta: Duration,
}

impl TradeGenerator {
    /// Generator starting 2020-07-02T00:00:00Z, one trade every 137ms.
    ///
    /// With `seed`, the sequence is reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let start = Utc
            .with_ymd_and_hms(2020, 7, 2, 0, 0, 0)
            .single()
            .unwrap_or_default();
        Self::with_schedule(seed, start, Duration::milliseconds(137))
    }

    /// Generator with an explicit start time and spacing.
    pub fn with_schedule(seed: Option<u64>, start: DateTime<Utc>, delta: Duration) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            rng,
            symbols: DEFAULT_SYMBOLS.iter().map(ToString::to_string).collect(),
            next_time: start,
            delta,
        }
    }

    /// Replace the symbol set. An empty set keeps the defaults.
    #[must_use]
    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        if !symbols.is_empty() {
            self.symbols = symbols;
        }
        self
    }
}

impl Iterator for TradeGenerator {
    type Item = Trade;

    fn next(&mut self) -> Option<Trade> {
        let time = self.next_time;
        self.next_time += self.delta;

        let symbol = self.symbols[self.rng.random_range(0..self.symbols.len())].clone();
        Some(Trade {
            time,
            symbol,
            price: self.rng.random_range(0.0..MAX_PRICE),
            is_buy: self.rng.random_bool(0.5),
        })
    }
}

/// Add `count` generated trades to `store`.
///
/// Returns the number added. The caller closes the store, which
/// flushes the tail.
///
/// # Errors
/// The first store error; trades generated after it are not added.
pub fn populate<B: TradeBackend>(
    store: &mut TradeStore<B>,
    generator: &mut TradeGenerator,
    count: usize,
) -> Result<usize, StoreError> {
    for trade in generator.by_ref().take(count) {
        store.add(trade)?;
    }
    info!(count, flushes = store.flush_count(), "Generated trades added");
    Ok(count)
}

/// Add `count` generated trades, then close `store`.
///
/// The store is closed even when adding fails, so trades buffered
/// before the failure get a final flush attempt.
///
/// # Errors
/// The add error if adding failed (a close failure is then only
/// logged), otherwise the close error.
pub fn populate_and_close<B: TradeBackend>(
    mut store: TradeStore<B>,
    generator: &mut TradeGenerator,
    count: usize,
) -> Result<usize, StoreError> {
    match populate(&mut store, generator, count) {
        Ok(added) => {
            store.close()?;
            Ok(added)
        }
        Err(err) => {
            if let Err(close_err) = store.close() {
                warn!(error = %close_err, "Trade store close failed after add error");
            }
            Err(err)
        }
    }
}
