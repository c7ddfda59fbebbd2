//! Prometheus Metrics Registry - Store Observability
//!
//! Registers flush, buffer and backpressure metrics and implements
//! the `StoreObserver` port so the stores can report into them.

use std::time::Duration;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder,
};
use tracing::warn;

use crate::ports::observer::StoreObserver;

/// Centralized Prometheus metrics for the trade store.
///
/// All metrics follow the naming convention `trade_store_*`.
pub struct StoreMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Committed batches.
    pub flushes: IntCounter,
    /// Batches that failed to commit.
    pub flush_failures: IntCounter,
    /// Trades committed.
    pub rows_flushed: IntCounter,
    /// Adds rejected by backpressure.
    pub rejected_adds: IntCounter,
    /// Trades waiting for a flush.
    pub buffered_trades: IntGauge,
    /// Time spent committing a batch.
    pub flush_duration: Histogram,
}

impl StoreMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let flushes = IntCounter::new("trade_store_flushes_total", "Committed trade batches")?;
        let flush_failures = IntCounter::new(
            "trade_store_flush_failures_total",
            "Trade batches that failed to commit",
        )?;
        let rows_flushed =
            IntCounter::new("trade_store_rows_flushed_total", "Trades committed")?;
        let rejected_adds = IntCounter::new(
            "trade_store_rejected_adds_total",
            "Trades rejected because the buffer was full",
        )?;
        let buffered_trades =
            IntGauge::new("trade_store_buffered_trades", "Trades waiting for a flush")?;
        let flush_duration = Histogram::with_opts(
            HistogramOpts::new(
                "trade_store_flush_duration_seconds",
                "Time to commit one trade batch",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;

        registry.register(Box::new(flushes.clone()))?;
        registry.register(Box::new(flush_failures.clone()))?;
        registry.register(Box::new(rows_flushed.clone()))?;
        registry.register(Box::new(rejected_adds.clone()))?;
        registry.register(Box::new(buffered_trades.clone()))?;
        registry.register(Box::new(flush_duration.clone()))?;

        Ok(Self {
            registry,
            flushes,
            flush_failures,
            rows_flushed,
            rejected_adds,
            buffered_trades,
            flush_duration,
        })
    }

    /// Encode all metrics in the Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl StoreObserver for StoreMetrics {
    fn flush_succeeded(&self, rows: usize, elapsed: Duration) {
        self.flushes.inc();
        self.rows_flushed.inc_by(rows as u64);
        self.flush_duration.observe(elapsed.as_secs_f64());
    }

    fn flush_failed(&self, _rows: usize) {
        self.flush_failures.inc();
    }

    fn add_rejected(&self) {
        self.rejected_adds.inc();
    }

    fn buffered(&self, pending: usize) {
        self.buffered_trades
            .set(i64::try_from(pending).unwrap_or(i64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_updates_counters() {
        let metrics = StoreMetrics::new().unwrap();
        metrics.flush_succeeded(4, Duration::from_millis(2));
        metrics.flush_succeeded(1, Duration::from_millis(1));
        metrics.flush_failed(3);

        assert_eq!(metrics.flushes.get(), 2);
        assert_eq!(metrics.rows_flushed.get(), 5);
        assert_eq!(metrics.flush_failures.get(), 1);
        assert_eq!(metrics.flush_duration.get_sample_count(), 2);
    }

    #[test]
    fn test_render_contains_metric_names() {
        let metrics = StoreMetrics::new().unwrap();
        metrics.add_rejected();
        metrics.buffered(7);

        let text = metrics.render();
        assert!(text.contains("trade_store_rejected_adds_total 1"));
        assert!(text.contains("trade_store_buffered_trades 7"));
    }
}
