//! brain-proxy: streaming chat-completion proxy
//!
//! Accepts a conversation on `POST /api/chat`, prefixes it with the Reality
//! Algorithm Generator system prompt built from the latest user message, and
//! streams the upstream completion back as it arrives.

pub mod config;
pub mod error;
pub mod prompt;
pub mod routes;
pub mod state;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use routes::build as app;
pub use state::AppState;
