//! Completion provider implementations

pub mod openai;

use crate::{Context, MessageEventStream, Model, Provider, Result, StreamOptions};
use async_trait::async_trait;

/// Trait for upstream chat-completion providers
///
/// `stream` resolves once the upstream has accepted the request. Rejections
/// that arrive before any content (bad key, quota, bad status) are returned as
/// `Err`; everything after that is reported through the event stream, which
/// always ends with exactly one terminal event.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Stream a completion for the given context
    async fn stream(
        &self,
        model: &Model,
        context: &Context,
        options: &StreamOptions,
    ) -> Result<MessageEventStream>;
}

/// Resolve the key for a provider.
///
/// A non-blank `provided` key wins, otherwise the provider's own variable is
/// read through `lookup`. Providers without a key variable only use `provided`.
pub fn provider_api_key(
    provider: Provider,
    provided: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let non_blank = |key: &str| !key.trim().is_empty();
    if let Some(key) = provided.filter(|k| non_blank(k)) {
        return Some(key.to_string());
    }
    provider
        .api_key_env_var()
        .and_then(lookup)
        .filter(|k| non_blank(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(key: &str) -> Option<String> {
        match key {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "GROQ_API_KEY" => Some("   ".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_provided_key_wins() {
        let key = provider_api_key(Provider::OpenAI, Some("sk-test"), env);
        assert_eq!(key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_falls_back_to_provider_variable() {
        assert_eq!(
            provider_api_key(Provider::OpenAI, None, env).as_deref(),
            Some("sk-env")
        );
        assert_eq!(
            provider_api_key(Provider::OpenAI, Some("  "), env).as_deref(),
            Some("sk-env")
        );
    }

    #[test]
    fn test_blank_or_missing_key_is_none() {
        assert_eq!(provider_api_key(Provider::Groq, None, env), None);
        assert_eq!(provider_api_key(Provider::OpenRouter, None, env), None);
    }

    #[test]
    fn test_keyless_provider() {
        assert_eq!(provider_api_key(Provider::Ollama, None, env), None);
        assert_eq!(
            provider_api_key(Provider::Custom, Some("k"), env).as_deref(),
            Some("k")
        );
    }
}
