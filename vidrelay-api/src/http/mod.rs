// Module: http
// Public HTTP surface: the stream relay route and a liveness check

pub mod relay;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use vidrelay_core::{config::RelayConfig, Observer};
use vidrelay_proxy::{Relay, RelayError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

impl AppState {
    pub fn new(config: &RelayConfig, observer: Arc<dyn Observer>) -> Result<Self, RelayError> {
        Ok(Self {
            relay: Relay::new(config, observer)?,
        })
    }
}

/// Create the HTTP router with all routes
///
/// CORS is not a router layer: the relay writes its own CORS headers on
/// every response, including rejections and upstream failures.
pub fn create_router(state: AppState, relay_path: &str) -> Router {
    Router::new()
        .route(
            relay_path,
            get(relay::relay_stream).options(relay::relay_options),
        )
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
