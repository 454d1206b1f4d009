//! Error types for brain-client

use thiserror::Error;

/// Result type alias using brain-client Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the proxy
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the provider/transport layer
    #[error(transparent)]
    Ai(#[from] brain_ai::Error),

    /// Input was empty or whitespace-only
    #[error("input is empty")]
    EmptyInput,

    /// A request is already in flight
    #[error("a response is still streaming")]
    ClientBusy,

    /// The response stream failed after it was opened
    #[error("stream failed: {0}")]
    Stream(String),

    /// The request was cancelled through the client handle
    #[error("request cancelled")]
    Cancelled,

    /// The submission or its `receive` future was dropped before the reply settled
    #[error("request dropped before completion")]
    Dropped,
}

impl Error {
    /// Rejections that callers treat as silent no-ops
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::EmptyInput | Error::ClientBusy)
    }
}
