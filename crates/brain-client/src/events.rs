//! Client lifecycle events

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted while a submission is processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// User message appended and placeholder created
    Submitted { request_id: Uuid, input: String },

    /// The proxy accepted the request and started streaming
    Opened { request_id: Uuid },

    /// A decoded chunk was appended to the placeholder
    Chunk { request_id: Uuid, delta: String },

    /// The reply finished normally
    Completed { request_id: Uuid, content: String },

    /// The reply failed; partial content stays in the conversation
    Failed { request_id: Uuid, reason: String },
}

impl ClientEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientEvent::Completed { .. } | ClientEvent::Failed { .. }
        )
    }

    pub fn request_id(&self) -> Uuid {
        match self {
            ClientEvent::Submitted { request_id, .. }
            | ClientEvent::Opened { request_id }
            | ClientEvent::Chunk { request_id, .. }
            | ClientEvent::Completed { request_id, .. }
            | ClientEvent::Failed { request_id, .. } => *request_id,
        }
    }
}
