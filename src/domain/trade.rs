//! Core trade record type.
//!
//! A `Trade` is a flat, immutable buy/sell event for a ticker symbol.
//! It carries no identity beyond its field values and has no
//! relationships to other records.
//!
//! Validation lives here as a pure function so callers (the HTTP
//! ingest handler, generators) can reject bad input before it
//! reaches the store. The store itself never validates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum symbol length accepted by the `trades.symbol` column.
pub const MAX_SYMBOL_LEN: usize = 32;

/// A buy/sell trade for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Event time of the trade.
    pub time: DateTime<Utc>,
    /// Ticker symbol (e.g. "MSFT").
    pub symbol: String,
    /// Execution price.
    pub price: f64,
    /// Direction flag: `true` for a buy, `false` for a sell.
    #[serde(rename = "buy")]
    pub is_buy: bool,
}

/// Why a trade was rejected by [`Trade::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeValidationError {
    /// Symbol is empty or whitespace.
    #[error("symbol must not be empty")]
    EmptySymbol,
    /// Symbol does not fit the column.
    #[error("symbol is {len} bytes, maximum is {}", MAX_SYMBOL_LEN)]
    SymbolTooLong {
        /// Actual length in bytes.
        len: usize,
    },
    /// Price is NaN or infinite.
    #[error("price must be a finite number")]
    NonFinitePrice,
}

impl Trade {
    /// Build a trade record.
    pub fn new(
        time: DateTime<Utc>,
        symbol: impl Into<String>,
        price: f64,
        is_buy: bool,
    ) -> Self {
        Self {
            time,
            symbol: symbol.into(),
            price,
            is_buy,
        }
    }

    /// Check the record against the `trades` table shape.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), TradeValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(TradeValidationError::EmptySymbol);
        }
        if self.symbol.len() > MAX_SYMBOL_LEN {
            return Err(TradeValidationError::SymbolTooLong {
                len: self.symbol.len(),
            });
        }
        if !self.price.is_finite() {
            return Err(TradeValidationError::NonFinitePrice);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msft() -> Trade {
        Trade::new(
            Utc.with_ymd_and_hms(2020, 7, 2, 9, 30, 0).unwrap(),
            "MSFT",
            216.39,
            false,
        )
    }

    #[test]
    fn test_valid_trade_passes() {
        assert_eq!(msft().validate(), Ok(()));
    }

    #[test]
    fn test_empty_symbol_rejected() {
        let mut trade = msft();
        trade.symbol = "  ".to_string();
        assert_eq!(trade.validate(), Err(TradeValidationError::EmptySymbol));
    }

    #[test]
    fn test_long_symbol_rejected() {
        let mut trade = msft();
        trade.symbol = "X".repeat(33);
        assert_eq!(
            trade.validate(),
            Err(TradeValidationError::SymbolTooLong { len: 33 })
        );
    }

    #[test]
    fn test_nan_price_rejected() {
        let mut trade = msft();
        trade.price = f64::NAN;
        assert_eq!(trade.validate(), Err(TradeValidationError::NonFinitePrice));
    }

    #[test]
    fn test_json_uses_buy_field_name() {
        let json = r#"{"time":"2020-07-02T09:30:00Z","symbol":"MSFT","price":216.39,"buy":false}"#;
        let trade: Trade = serde_json::from_str(json).unwrap();
        assert_eq!(trade, msft());

        let out = serde_json::to_value(&trade).unwrap();
        assert_eq!(out["buy"], serde_json::json!(false));
        assert!(out.get("is_buy").is_none());
    }
}
