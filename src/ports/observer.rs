//! Observer Port - Store Telemetry Hooks
//!
//! Lets the stores report flush outcomes and buffer depth without
//! knowing which metrics system (if any) is attached.

use std::time::Duration;

/// Receives store lifecycle events.
pub trait StoreObserver: Send + Sync {
  /// A batch of `rows` trades was committed in `elapsed`.
  fn flush_succeeded(&self, rows: usize, elapsed: Duration);

  /// A batch of `rows` trades failed to commit and was kept.
  fn flush_failed(&self, rows: usize);

  /// An add was rejected by backpressure.
  fn add_rejected(&self);

  /// Current number of trades waiting for a flush.
  fn buffered(&self, pending: usize);
}
