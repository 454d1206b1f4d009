//! Streaming event types and utilities

use crate::types::{StopReason, Usage};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a completion streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Upstream connection is open
    Start,
    /// Text content delta
    TextDelta { delta: String },
    /// Completion ended normally
    Done {
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Completion ended abnormally
    Error { message: String },
}

impl MessageEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done { .. } | MessageEvent::Error { .. })
    }

    /// Shorthand for a text delta
    pub fn text(delta: impl Into<String>) -> Self {
        MessageEvent::TextDelta {
            delta: delta.into(),
        }
    }

    /// Shorthand for a normal stop with no usage information
    pub fn done() -> Self {
        MessageEvent::Done {
            stop_reason: StopReason::Stop,
            usage: Usage::default(),
        }
    }

    /// Shorthand for an error event
    pub fn error(message: impl Into<String>) -> Self {
        MessageEvent::Error {
            message: message.into(),
        }
    }
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// How a collected stream ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No terminal event seen yet
    Pending,
    Done { stop_reason: StopReason, usage: Usage },
    Error(String),
}

/// Folds streaming events into the final completion text
#[derive(Debug)]
pub struct TextCollector {
    text: String,
    deltas: usize,
    outcome: Outcome,
}

impl Default for TextCollector {
    fn default() -> Self {
        Self {
            text: String::new(),
            deltas: 0,
            outcome: Outcome::Pending,
        }
    }
}

impl TextCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a streaming event. Events after the terminal one are ignored.
    pub fn process_event(&mut self, event: &MessageEvent) {
        if self.is_finished() {
            return;
        }
        match event {
            MessageEvent::Start => {}
            MessageEvent::TextDelta { delta } => {
                self.text.push_str(delta);
                self.deltas += 1;
            }
            MessageEvent::Done { stop_reason, usage } => {
                self.outcome = Outcome::Done {
                    stop_reason: *stop_reason,
                    usage: usage.clone(),
                };
            }
            MessageEvent::Error { message } => {
                self.outcome = Outcome::Error(message.clone());
            }
        }
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of text deltas applied
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.outcome, Outcome::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_deltas_in_order() {
        let mut collector = TextCollector::new();
        for event in [
            MessageEvent::Start,
            MessageEvent::text("Reality "),
            MessageEvent::text("Overview"),
            MessageEvent::done(),
        ] {
            collector.process_event(&event);
        }
        assert_eq!(collector.deltas(), 2);
        assert_eq!(collector.text(), "Reality Overview");
        assert!(matches!(collector.outcome(), Outcome::Done { .. }));
    }

    #[test]
    fn test_error_keeps_partial_text() {
        let mut collector = TextCollector::new();
        collector.process_event(&MessageEvent::text("partial"));
        collector.process_event(&MessageEvent::error("connection reset"));
        collector.process_event(&MessageEvent::text(" ignored"));

        assert_eq!(collector.text(), "partial");
        assert_eq!(
            collector.outcome(),
            &Outcome::Error("connection reset".to_string())
        );
    }

    #[test]
    fn test_missing_terminal_event_is_error() {
        let mut collector = TextCollector::new();
        collector.process_event(&MessageEvent::text("abc"));
        assert!(!collector.is_finished());
        assert_eq!(collector.outcome(), &Outcome::Pending);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(MessageEvent::text("x")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text_delta", "delta": "x"}));
        assert!(MessageEvent::done().is_terminal());
        assert!(!MessageEvent::Start.is_terminal());
    }
}
