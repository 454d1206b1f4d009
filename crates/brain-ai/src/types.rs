//! Core types for chat-completion interactions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Known OpenAI-compatible providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Groq,
    OpenRouter,
    Ollama,
    Custom,
}

impl Provider {
    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Groq => "Groq",
            Provider::OpenRouter => "OpenRouter",
            Provider::Ollama => "Ollama",
            Provider::Custom => "Custom",
        }
    }

    /// Parse a provider id, falling back to `Custom` for anything unknown
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "groq" => Provider::Groq,
            "openrouter" => Provider::OpenRouter,
            "ollama" => Provider::Ollama,
            _ => Provider::Custom,
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
            Provider::Ollama => None,
            Provider::Custom => None,
        }
    }

    /// Default chat-completions base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::Custom => "",
        }
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (e.g., "gpt-3.5-turbo")
    pub id: String,
    /// Provider
    pub provider: Provider,
    /// Base URL for API calls
    pub base_url: String,
    /// Additional headers for API calls
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Model {
    /// Create a model served from the provider's default endpoint
    pub fn new(provider: Provider, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider,
            base_url: provider.default_base_url().to_string(),
            headers: HashMap::new(),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
}

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    Stop,
    /// Maximum tokens reached
    Length,
    /// Output withheld by the provider's filter
    ContentFilter,
    /// Error occurred
    Error,
    /// Request was aborted
    Aborted,
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason` string
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "length" => StopReason::Length,
            "content_filter" => StopReason::ContentFilter,
            _ => StopReason::Stop,
        }
    }

    /// Wire name, as used in `finish_reason` fields
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Stop => "stop",
            StopReason::Length => "length",
            StopReason::ContentFilter => "content_filter",
            StopReason::Error => "error",
            StopReason::Aborted => "aborted",
        }
    }
}

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A role-tagged chat message, `{"role": "...", "content": "..."}` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Context for a completion request
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Conversation messages, system messages included, in order
    pub messages: Vec<Message>,
}

impl Context {
    /// Create a context from an ordered message list
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Add a message to the context
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// Options for streaming requests
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
}
