//! Metrics Adapters
//!
//! Prometheus registry for flush and buffer telemetry. The text
//! exposition is served on `/metrics` by the ingest server.

pub mod prometheus;

pub use prometheus::StoreMetrics;
