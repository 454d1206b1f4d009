//! Error types for brain-ai

use thiserror::Error;

/// Result type alias using brain-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a completion provider
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Upstream answered with a non-success status and no structured error
    #[error("Upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Rate limit or quota exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Stream was aborted
    #[error("Request aborted")]
    Aborted,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Check if this error means the provider credential was rejected
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Error::Auth(_) | Error::InvalidApiKey => true,
            Error::Status { status, .. } => *status == 401 || *status == 403,
            Error::Api { error_type, .. } => {
                let et = error_type.to_lowercase();
                et.contains("authentication") || et.contains("invalid_api_key")
            }
            _ => false,
        }
    }

    /// Check if this error is a quota or rate-limit rejection
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::RateLimited { .. } => true,
            Error::Status { status, .. } => *status == 429,
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                et.contains("rate_limit")
                    || et.contains("insufficient_quota")
                    || msg.contains("rate limit")
                    || msg.contains("exceeded your current quota")
                    || msg.contains("too many requests")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_variants() {
        assert!(Error::Auth("bad key".into()).is_auth_failure());
        assert!(Error::InvalidApiKey.is_auth_failure());
        assert!(
            Error::Status {
                status: 403,
                message: "forbidden".into()
            }
            .is_auth_failure()
        );
    }

    #[test]
    fn test_auth_failure_api_error_type() {
        let e = Error::api("invalid_api_key", "Incorrect API key provided");
        assert!(e.is_auth_failure());
        assert!(!e.is_rate_limited());
    }

    #[test]
    fn test_rate_limited_variants() {
        assert!(Error::RateLimited { retry_after: Some(3) }.is_rate_limited());
        assert!(
            Error::Status {
                status: 429,
                message: String::new()
            }
            .is_rate_limited()
        );
    }

    #[test]
    fn test_rate_limited_quota_message() {
        let e = Error::api(
            "insufficient_quota",
            "You exceeded your current quota, please check your plan",
        );
        assert!(e.is_rate_limited());
        assert!(!e.is_auth_failure());
    }

    #[test]
    fn test_plain_errors_are_neither() {
        let e = Error::Sse("connection reset".into());
        assert!(!e.is_auth_failure());
        assert!(!e.is_rate_limited());
        assert!(!Error::Aborted.is_rate_limited());
    }
}
