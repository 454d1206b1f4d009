//! Proxy configuration, loaded from environment variables at startup.

use brain_ai::providers::provider_api_key;
use brain_ai::{Model, Provider, StreamOptions};

/// Default upstream model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Runtime configuration for the proxy.
///
/// Every field has a default, so the proxy runs with nothing but
/// `OPENAI_API_KEY` in the environment.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Upstream provider (`BRAIN_PROVIDER`, default `openai`).
    pub provider: Provider,

    /// Upstream model id (`BRAIN_MODEL`).
    pub model: String,

    /// Overrides the provider's default base URL.
    pub upstream_url: Option<String>,

    /// Upstream credential, from `BRAIN_API_KEY` or the provider's own variable.
    pub api_key: Option<String>,

    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,

    /// Comma-separated allowed origins; unset means any origin.
    pub cors_allowed_origins: Option<String>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ProxyConfig {
    /// Build [`ProxyConfig`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = get("BRAIN_PROVIDER")
            .map(|p| Provider::parse(&p))
            .unwrap_or(Provider::OpenAI);
        let api_key = provider_api_key(provider, get("BRAIN_API_KEY").as_deref(), &lookup);

        Self {
            bind_address: get("BRAIN_BIND").unwrap_or_else(|| "0.0.0.0:3000".to_owned()),
            provider,
            model: get("BRAIN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            upstream_url: get("BRAIN_UPSTREAM_URL"),
            api_key,
            max_tokens: get("BRAIN_MAX_TOKENS").and_then(|v| v.parse().ok()),
            temperature: get("BRAIN_TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .filter(|t: &f32| (0.0..=2.0).contains(t)),
            cors_allowed_origins: get("BRAIN_CORS_ORIGINS"),
            log_level: get("BRAIN_LOG").unwrap_or_else(|| "info".to_owned()),
            log_json: get("BRAIN_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// The upstream model the proxy forwards to
    pub fn model(&self) -> Model {
        let model = Model::new(self.provider, &self.model);
        match self.upstream_url {
            Some(ref url) => model.with_base_url(url.trim_end_matches('/')),
            None => model,
        }
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Whether the configured provider expects a key that is not set
    pub fn missing_api_key(&self) -> bool {
        self.api_key.is_none() && self.provider.api_key_env_var().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ProxyConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProxyConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.bind_address, "0.0.0.0:3000");
        assert_eq!(cfg.provider, Provider::OpenAI);
        assert_eq!(cfg.model, "gpt-3.5-turbo");
        assert_eq!(cfg.model().base_url, "https://api.openai.com/v1");
        assert!(cfg.missing_api_key());
        assert!(!cfg.log_json);
    }

    #[test]
    fn provider_key_and_overrides() {
        let cfg = config_from(&[
            ("BRAIN_PROVIDER", "groq"),
            ("GROQ_API_KEY", "gsk-1"),
            ("BRAIN_MODEL", "llama-3.1-8b-instant"),
            ("BRAIN_UPSTREAM_URL", "http://127.0.0.1:9000/v1/"),
            ("BRAIN_MAX_TOKENS", "256"),
            ("BRAIN_LOG_JSON", "true"),
        ]);
        assert_eq!(cfg.api_key.as_deref(), Some("gsk-1"));
        assert_eq!(cfg.model().base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(cfg.model().id, "llama-3.1-8b-instant");
        assert_eq!(cfg.stream_options().max_tokens, Some(256));
        assert!(cfg.log_json);
    }

    #[test]
    fn out_of_range_temperature_is_ignored() {
        let cfg = config_from(&[("BRAIN_TEMPERATURE", "5.0")]);
        assert!(cfg.temperature.is_none());
        let cfg = config_from(&[("BRAIN_TEMPERATURE", "0.4")]);
        assert_eq!(cfg.temperature, Some(0.4));
    }

    #[test]
    fn brain_api_key_overrides_provider_variable() {
        let cfg = config_from(&[("BRAIN_API_KEY", "sk-brain"), ("OPENAI_API_KEY", "sk-env")]);
        assert_eq!(cfg.api_key.as_deref(), Some("sk-brain"));

        let cfg = config_from(&[("BRAIN_API_KEY", " "), ("OPENAI_API_KEY", "sk-env")]);
        assert_eq!(cfg.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn keyless_provider_is_not_missing_key() {
        let cfg = config_from(&[("BRAIN_PROVIDER", "ollama")]);
        assert!(!cfg.missing_api_key());
    }
}
