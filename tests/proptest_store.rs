//! Property-Based Tests - Buffering and Persistence Invariants
//!
//! Uses `proptest` to check that flush counts follow the capacity
//! boundary and that whatever is added comes back, in order, after
//! close.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use trade_store::adapters::persistence::{SqliteBackend, TradeReader};
use trade_store::domain::trade::Trade;
use trade_store::usecases::{SharedTradeStore, TradeStore};

fn nth_trade(i: usize) -> Trade {
    let start = Utc.with_ymd_and_hms(2020, 7, 2, 0, 0, 0).unwrap();
    Trade::new(start + Duration::milliseconds(137 * i as i64), "MSFT", 1.0, true)
}

fn arb_trade() -> impl Strategy<Value = (String, f64, bool)> {
    ("[A-Z]{1,8}", 0.0f64..500.0, any::<bool>())
}

// ── Capacity Boundary ───────────────────────────────────────

proptest! {
    /// n adds at capacity c flush exactly n / c times, leaving n % c buffered.
    #[test]
    fn flush_count_follows_capacity(
        capacity in 1usize..64,
        n in 0usize..300,
    ) {
        let backend = SqliteBackend::in_memory().unwrap();
        let mut store = TradeStore::open(backend, capacity).unwrap();
        for i in 0..n {
            store.add(nth_trade(i)).unwrap();
        }
        prop_assert_eq!(store.flush_count(), (n / capacity) as u64);
        prop_assert_eq!(store.buffered(), n % capacity);
        prop_assert!(store.buffered() < capacity);
    }

    /// The shared store obeys the same boundary when driven from one thread.
    #[test]
    fn shared_flush_count_follows_capacity(
        capacity in 1usize..64,
        n in 0usize..300,
    ) {
        let backend = SqliteBackend::in_memory().unwrap();
        let store = SharedTradeStore::open(backend, capacity).unwrap();
        for i in 0..n {
            store.add(nth_trade(i)).unwrap();
        }
        prop_assert_eq!(store.flush_count(), (n / capacity) as u64);
        prop_assert_eq!(store.buffered(), n % capacity);
    }
}

// ── Persistence Round Trip ──────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every added trade is stored once, in insertion order, after close.
    #[test]
    fn close_persists_everything_in_order(
        capacity in 1usize..16,
        fields in prop::collection::vec(arb_trade(), 0..80),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.db");
        let path = path.to_str().unwrap();

        let start = Utc.with_ymd_and_hms(2020, 7, 2, 0, 0, 0).unwrap();
        let trades: Vec<Trade> = fields
            .into_iter()
            .enumerate()
            .map(|(i, (symbol, price, is_buy))| {
                Trade::new(start + Duration::seconds(i as i64), symbol, price, is_buy)
            })
            .collect();

        let mut store = TradeStore::open_sqlite(path, capacity).unwrap();
        for t in &trades {
            store.add(t.clone()).unwrap();
        }
        store.close().unwrap();

        let stored = TradeReader::open(path).unwrap().load_all().unwrap();
        prop_assert_eq!(stored, trades);
    }
}
