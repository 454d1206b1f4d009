//! Conversation state: entries, streaming status, and the in-flight stream.

use brain_ai::{Message, Role};
use uuid::Uuid;

/// Lifecycle state of a conversation entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Final,
    Streaming,
    /// The reply failed; content holds whatever arrived before the failure.
    Failed(String),
}

/// One message in the conversation together with its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub message: Message,
    pub state: EntryState,
}

impl ChatEntry {
    pub fn role(&self) -> Role {
        self.message.role
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }

    pub fn is_streaming(&self) -> bool {
        self.state == EntryState::Streaming
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, EntryState::Failed(_))
    }
}

/// Bookkeeping for the request currently streaming into the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub request_id: Uuid,
    /// Index of the assistant placeholder
    pub entry_index: usize,
    pub chunks: usize,
    pub bytes: usize,
}

/// Append-only conversation.
///
/// Entries are never removed or reordered. The only in-place mutation is
/// content growth and the final state change of the streaming placeholder.
#[derive(Debug, Default)]
pub struct Conversation {
    entries: Vec<ChatEntry>,
    stream: Option<StreamState>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream_state(&self) -> Option<&StreamState> {
        self.stream.as_ref()
    }

    /// Messages to send to the proxy: every settled entry except failed ones.
    pub fn history(&self) -> Vec<Message> {
        self.entries
            .iter()
            .filter(|e| e.state == EntryState::Final)
            .map(|e| e.message.clone())
            .collect()
    }

    pub(crate) fn push_user(&mut self, text: &str) {
        self.entries.push(ChatEntry {
            message: Message::user(text),
            state: EntryState::Final,
        });
    }

    /// Append an empty assistant placeholder and mark the conversation as streaming.
    pub(crate) fn begin_stream(&mut self, request_id: Uuid) {
        self.entries.push(ChatEntry {
            message: Message::assistant(""),
            state: EntryState::Streaming,
        });
        self.stream = Some(StreamState {
            request_id,
            entry_index: self.entries.len() - 1,
            chunks: 0,
            bytes: 0,
        });
    }

    /// Append a chunk to the placeholder. Returns false when nothing is streaming.
    pub(crate) fn append_chunk(&mut self, delta: &str) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(stream.entry_index) else {
            return false;
        };
        entry.message.content.push_str(delta);
        stream.chunks += 1;
        stream.bytes += delta.len();
        true
    }

    /// Settle the placeholder and clear the stream state.
    ///
    /// Returns the settled entry's content and the final stream bookkeeping.
    pub(crate) fn settle(&mut self, state: EntryState) -> Option<(String, StreamState)> {
        let stream = self.stream.take()?;
        let entry = self.entries.get_mut(stream.entry_index)?;
        entry.state = state;
        Some((entry.message.content.clone(), stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_lifecycle() {
        let mut conv = Conversation::new();
        conv.push_user("a world of glass");
        let id = Uuid::new_v4();
        conv.begin_stream(id);

        assert!(conv.is_streaming());
        assert_eq!(conv.stream_state().unwrap().entry_index, 1);
        assert!(conv.append_chunk("Reality "));
        assert!(conv.append_chunk("Overview"));
        assert_eq!(conv.entries()[1].content(), "Reality Overview");

        let (content, stream) = conv.settle(EntryState::Final).unwrap();
        assert_eq!(content, "Reality Overview");
        assert_eq!(stream.chunks, 2);
        assert_eq!(stream.bytes, "Reality Overview".len());
        assert!(!conv.is_streaming());
        assert!(!conv.append_chunk("late"));
    }

    #[test]
    fn test_history_skips_failed_and_streaming() {
        let mut conv = Conversation::new();
        conv.push_user("first");
        conv.begin_stream(Uuid::new_v4());
        conv.append_chunk("half");
        conv.settle(EntryState::Failed("reset".into()));

        conv.push_user("second");
        conv.begin_stream(Uuid::new_v4());

        let history = conv.history();
        assert_eq!(history, vec![Message::user("first"), Message::user("second")]);
        assert_eq!(conv.len(), 4);
        assert!(conv.entries()[1].is_failed());
        assert_eq!(conv.entries()[1].content(), "half");
    }

    #[test]
    fn test_settle_without_stream() {
        let mut conv = Conversation::new();
        assert!(conv.settle(EntryState::Final).is_none());
    }
}
