//! Health / heartbeat endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Returns `{"status": "ok", "version": "..."}` with HTTP 200.
pub async fn get_health() -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn health_response_has_ok_status() {
        let Json(body) = get_health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn health_response_has_version() {
        let Json(body) = get_health().await;
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }
}
