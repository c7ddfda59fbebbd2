//! HTTP Adapters - Trade Ingest
//!
//! Axum server that decodes inbound trades and forwards them to the
//! shared store, plus health and metrics endpoints.

pub mod ingest;

pub use ingest::{IngestServer, IngestState, router};
