//! Proxy error type.
//!
//! Handlers return `Result<T, ProxyError>`, which implements
//! [`axum::response::IntoResponse`]. Upstream failures are logged with full
//! detail; the caller only sees a short, generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The caller sent a malformed or unusable request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream completion API rejected or failed the request.
    #[error("upstream error: {0}")]
    Upstream(#[from] brain_ai::Error),
}

impl ProxyError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ProxyError::InvalidRequest(message.into())
    }

    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(e) if e.is_rate_limited() => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let client_message = match &self {
            ProxyError::InvalidRequest(m) => {
                warn!(reason = %m, "rejected chat request");
                m.clone()
            }
            ProxyError::Upstream(e) if e.is_rate_limited() => {
                error!(error = %e, "upstream rate limit or quota exceeded");
                "upstream rate limit or quota exceeded".to_owned()
            }
            ProxyError::Upstream(e) if e.is_auth_failure() => {
                error!(error = %e, "upstream authentication failed");
                "upstream authentication failed".to_owned()
            }
            ProxyError::Upstream(e) => {
                error!(error = %e, "upstream request failed");
                "upstream request failed".to_owned()
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}
