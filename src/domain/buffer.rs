//! Bounded, insertion-ordered buffer of pending trades.

use super::error::StoreError;
use super::trade::Trade;

/// Fixed-capacity buffer holding trades until the next flush.
///
/// The buffer never grows past `capacity`. Once full, `push` rejects
/// new trades with [`StoreError::BufferFull`] until the contents are
/// drained with [`TradeBuffer::clear`] or [`TradeBuffer::take`].
#[derive(Debug, Clone)]
pub struct TradeBuffer {
    trades: Vec<Trade>,
    capacity: usize,
}

impl TradeBuffer {
    /// Create an empty buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            trades: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a trade. Returns `true` when the buffer is now full.
    ///
    /// # Errors
    /// `BufferFull` if the buffer was already at capacity; the trade
    /// is not stored.
    pub fn push(&mut self, trade: Trade) -> Result<bool, StoreError> {
        if self.is_full() {
            return Err(StoreError::BufferFull {
                capacity: self.capacity,
            });
        }
        self.trades.push(trade);
        Ok(self.is_full())
    }

    /// Pending trades in insertion order.
    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    /// Drop all pending trades, keeping the allocation.
    pub fn clear(&mut self) {
        self.trades.clear();
    }

    /// Detach the pending trades, leaving a fresh empty buffer behind.
    pub fn take(&mut self) -> Vec<Trade> {
        std::mem::replace(&mut self.trades, Vec::with_capacity(self.capacity))
    }

    /// Number of pending trades.
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// Whether no trades are pending.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Whether the buffer reached its capacity.
    pub fn is_full(&self) -> bool {
        self.trades.len() >= self.capacity
    }

    /// Configured capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trade(symbol: &str) -> Trade {
        Trade::new(Utc::now(), symbol, 100.0, true)
    }

    #[test]
    fn test_push_reports_full_on_last_slot() {
        let mut buffer = TradeBuffer::new(2);
        assert!(!buffer.push(trade("MSFT")).unwrap());
        assert!(buffer.push(trade("GOOG")).unwrap());
        assert!(buffer.is_full());
    }

    #[test]
    fn test_push_when_full_is_rejected() {
        let mut buffer = TradeBuffer::new(1);
        buffer.push(trade("MSFT")).unwrap();
        let err = buffer.push(trade("GOOG")).unwrap_err();
        assert!(matches!(err, StoreError::BufferFull { capacity: 1 }));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.as_slice()[0].symbol, "MSFT");
    }

    #[test]
    fn test_take_preserves_order_and_empties() {
        let mut buffer = TradeBuffer::new(3);
        for s in ["A", "B", "C"] {
            buffer.push(trade(s)).unwrap();
        }
        let batch = buffer.take();
        let symbols: Vec<_> = batch.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, ["A", "B", "C"]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let buffer = TradeBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
    }
}
