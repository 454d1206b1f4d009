//! Shared application state injected into every handler.

use std::sync::Arc;

use brain_ai::providers::CompletionProvider;
use brain_ai::{Model, StreamOptions};

use crate::config::ProxyConfig;

/// State shared across all HTTP handlers. The proxy keeps no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub provider: Arc<dyn CompletionProvider>,
    pub model: Model,
    pub options: StreamOptions,
}

impl AppState {
    pub fn new(config: ProxyConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let model = config.model();
        let options = config.stream_options();
        Self {
            config: Arc::new(config),
            provider,
            model,
            options,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("model", &self.model.id)
            .field("base_url", &self.model.base_url)
            .finish_non_exhaustive()
    }
}
