//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - `POST /api/chat` streaming completion route
//! - `GET /health`
//! - CORS and per-request tracing layers

pub mod chat;
mod health;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the proxy.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(chat::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &ProxyConfig) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
