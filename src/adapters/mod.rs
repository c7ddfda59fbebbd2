//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (SQLite, HTTP, Prometheus). Each sub-module
//! groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `http`: Axum trade ingest server with health probes
//! - `metrics`: Prometheus store metrics
//! - `persistence`: SQLite backend and read-only analysis queries

pub mod http;
pub mod metrics;
pub mod persistence;
