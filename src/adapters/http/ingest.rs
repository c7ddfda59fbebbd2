//! Ingest Server - HTTP Front Door for the Shared Store
//!
//! Decodes JSON trades posted to `/trade`, validates them and hands
//! them to `SharedTradeStore::add` on the blocking pool. The store is
//! injected through axum state; there is no global handle.
//!
//! Routes:
//! - `POST /trade`  - 202 accepted, 400 invalid, 503 backpressure/closed
//! - `POST /flush`  - 204 flushed, 500 on failure
//! - `GET /live`    - liveness, always 200
//! - `GET /ready`   - 200 while the store is open, 503 after close
//! - `GET /metrics` - Prometheus text format (when metrics are attached)

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use crate::adapters::metrics::StoreMetrics;
use crate::domain::error::StoreError;
use crate::domain::trade::Trade;
use crate::ports::backend::TradeBackend;
use crate::usecases::shared_store::SharedTradeStore;

/// State shared by all ingest handlers.
pub struct IngestState<B: TradeBackend> {
    /// Store receiving decoded trades.
    pub store: Arc<SharedTradeStore<B>>,
    /// Metrics served on `/metrics`, if enabled.
    pub metrics: Option<Arc<StoreMetrics>>,
}

impl<B: TradeBackend> IngestState<B> {
    /// Create handler state around `store`.
    pub fn new(store: Arc<SharedTradeStore<B>>, metrics: Option<Arc<StoreMetrics>>) -> Self {
        Self { store, metrics }
    }
}

/// Build the ingest router.
pub fn router<B: TradeBackend + 'static>(state: Arc<IngestState<B>>) -> Router {
    Router::new()
        .route("/trade", post(ingest_trade::<B>))
        .route("/flush", post(flush_trades::<B>))
        .route("/live", get(liveness))
        .route("/ready", get(readiness::<B>))
        .route("/metrics", get(metrics::<B>))
        .with_state(state)
}

/// Axum-based trade ingest server.
pub struct IngestServer<B: TradeBackend> {
    state: Arc<IngestState<B>>,
    bind_address: String,
}

impl<B: TradeBackend + 'static> IngestServer<B> {
    /// Create a new ingest server.
    pub fn new(state: Arc<IngestState<B>>, bind_address: String) -> Self {
        Self {
            state,
            bind_address,
        }
    }

    /// Serve until a shutdown signal arrives.
    ///
    /// The store is not closed here; the owner closes it after the
    /// server has stopped accepting requests.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        info!(address = %self.bind_address, "Ingest server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        info!("Ingest server stopped");
        Ok(())
    }
}

/// Accept one trade.
#[instrument(skip_all, fields(symbol = %trade.symbol))]
pub async fn ingest_trade<B: TradeBackend + 'static>(
    State(state): State<Arc<IngestState<B>>>,
    Json(trade): Json<Trade>,
) -> Response {
    if let Err(e) = trade.validate() {
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }

    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.add(trade)).await {
        Ok(Ok(())) => StatusCode::ACCEPTED.into_response(),
        Ok(Err(e)) => store_error_response(&e),
        Err(e) => {
            error!(error = %e, "Trade add task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Force a flush of pending trades.
pub async fn flush_trades<B: TradeBackend + 'static>(
    State(state): State<Arc<IngestState<B>>>,
) -> Response {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.flush()).await {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => store_error_response(&e),
        Err(e) => {
            error!(error = %e, "Flush task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: 200 only while the store accepts trades.
async fn readiness<B: TradeBackend + 'static>(
    State(state): State<Arc<IngestState<B>>>,
) -> impl IntoResponse {
    if state.store.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    } else {
        (StatusCode::OK, "READY")
    }
}

async fn metrics<B: TradeBackend + 'static>(
    State(state): State<Arc<IngestState<B>>>,
) -> Response {
    state.metrics.as_ref().map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |m| m.render().into_response(),
    )
}

/// Map a store error to a transport response.
///
/// Backpressure and shutdown are retryable (503); anything else means
/// the batch failed to persist (500).
fn store_error_response(err: &StoreError) -> Response {
    let status = match err {
        StoreError::BufferFull { .. } | StoreError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(error = %err, status = status.as_u16(), "Store rejected request");
    (status, err.to_string()).into_response()
}
