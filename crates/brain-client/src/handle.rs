//! A cloneable handle for cancelling the client's in-flight request.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A cloneable handle for ending the in-flight request from outside the client.
///
/// Each submission installs a fresh token, so aborting while idle has no
/// effect on later submissions.
#[derive(Clone, Default)]
pub struct ClientHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
}

impl ClientHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Abort the in-flight request, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Install a fresh token for a new request and return it.
    pub(crate) fn reset(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }
}
