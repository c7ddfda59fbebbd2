//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides (`DB_FILE`, `HTTPD_ADDR`).
//! Every section has defaults, so a missing file or a partial
//! file still yields a runnable configuration.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Trade store backend and buffering.
  #[serde(default)]
  pub store: StoreConfig,
  /// Ingest HTTP server.
  #[serde(default)]
  pub server: ServerConfig,
  /// Metrics export.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Emit JSON-formatted log lines.
  #[serde(default = "default_true")]
  pub json_logs: bool,
}

/// Trade store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// SQLite database file.
  #[serde(default = "default_db_file")]
  pub db_file: String,
  /// Trades buffered before an automatic flush.
  #[serde(default = "default_buffer_capacity")]
  pub buffer_capacity: usize,
  /// SQLite busy timeout (milliseconds).
  #[serde(default = "default_busy_timeout")]
  pub busy_timeout_ms: u64,
}

/// Ingest server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Listen address for `/trade`, probes and `/metrics`.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
      json_logs: true,
    }
  }
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      db_file: default_db_file(),
      buffer_capacity: default_buffer_capacity(),
      busy_timeout_ms: default_busy_timeout(),
    }
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind_address: default_bind_address(),
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self { enabled: true }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "trade-store".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

fn default_db_file() -> String {
  "trades.db".to_string()
}

const fn default_buffer_capacity() -> usize {
  crate::usecases::trade_store::DEFAULT_CAPACITY
}

const fn default_busy_timeout() -> u64 {
  5_000
}

fn default_bind_address() -> String {
  "0.0.0.0:8080".to_string()
}
