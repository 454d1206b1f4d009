//! brain-ai: chat-completion message model and upstream providers
//!
//! This crate holds the role-tagged message types shared by the proxy and the
//! client, the streaming event model, and the OpenAI-compatible provider that
//! the proxy forwards conversations to.

pub mod error;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use stream::{MessageEvent, MessageEventStream, Outcome, TextCollector};
pub use types::*;
