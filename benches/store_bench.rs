//! Trade Store Benchmarks - Buffered vs Per-Record Inserts
//!
//! Measures `add` throughput against a real SQLite file. Capacity 1
//! commits one transaction per trade; the default capacity amortizes
//! the commit over a full batch.
//!
//! Run with: cargo bench --bench store_bench

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};

use trade_store::usecases::{DEFAULT_CAPACITY, TradeGenerator, TradeStore, populate};

const TRADES: usize = 4_096;

fn bench_add(c: &mut Criterion, name: &str, capacity: usize) {
    let mut group = c.benchmark_group("store_add");
    group.throughput(Throughput::Elements(TRADES as u64));
    group.sample_size(10);

    group.bench_function(name, |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("bench.db");
                let store = TradeStore::open_sqlite(path.to_str().unwrap(), capacity).unwrap();
                (dir, store, TradeGenerator::new(Some(7)))
            },
            |(dir, mut store, mut generator)| {
                populate(&mut store, &mut generator, TRADES).unwrap();
                store.close().unwrap();
                drop(dir);
            },
            BatchSize::PerIteration,
        );
    });
    group.finish();
}

/// Default capacity: one transaction per 1024 trades.
fn bench_buffered(c: &mut Criterion) {
    bench_add(c, "buffered_1024", DEFAULT_CAPACITY);
}

/// Capacity 1: one transaction per trade.
fn bench_unbuffered(c: &mut Criterion) {
    bench_add(c, "unbuffered", 1);
}

criterion_group!(benches, bench_buffered, bench_unbuffered);
criterion_main!(benches);
