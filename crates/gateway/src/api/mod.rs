//! HTTP API surface of the gateway.

pub mod books;
pub mod health;
pub mod trace_context;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use observer_trace::{PropagationBridge, ServiceTracer};

use crate::client::StorageClient;
use crate::metrics::GatewayMetrics;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Span factory for this process.
    pub tracer: ServiceTracer,
    /// Outbound side of the manual RPC boundary; injects `x-trace-id`
    /// into storage call metadata.
    pub bridge: PropagationBridge,
    /// Storage RPC client.
    pub client: StorageClient,
    /// Request counters.
    pub metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Assemble the state; the bridge wraps the same tracer it is given.
    pub fn new(tracer: ServiceTracer, client: StorageClient) -> Self {
        Self {
            bridge: PropagationBridge::manual(tracer.clone()),
            tracer,
            client,
            metrics: Arc::new(GatewayMetrics::default()),
        }
    }
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/storage/{id}", get(books::get_book))
        .route("/storage", post(books::add_book))
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .layer(middleware::from_fn(trace_context::extract_trace_scope))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
