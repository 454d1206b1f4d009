//! brain-client: chat client for the Brain Terminal proxy
//!
//! Owns the conversation, submits it to the proxy one request at a time, and
//! folds the streamed reply into a growing assistant entry.

pub mod client;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod transport;

pub use client::{ChatClient, Submission};
pub use conversation::{ChatEntry, Conversation, EntryState, StreamState};
pub use error::{Error, Result};
pub use events::ClientEvent;
pub use handle::ClientHandle;
pub use transport::{Framing, ProxyTransport, Transport};
