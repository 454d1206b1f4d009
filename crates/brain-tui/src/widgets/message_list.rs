//! Chat transcript widget

use crate::theme::Theme;
use crate::widgets::markdown::{render_markdown, wrap_spans};
use crate::widgets::spinner;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::Instant;

/// Who a transcript entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    /// The AI; shown as SYSTEM in the transcript
    System,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "USER: ",
            Speaker::System => "SYSTEM: ",
        }
    }
}

/// Display state of a transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Done,
    Streaming,
    Failed(String),
}

/// A single entry in the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub content: String,
    pub status: MessageStatus,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: content.into(),
            status: MessageStatus::Done,
        }
    }

    /// Create a finished AI message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::System,
            content: content.into(),
            status: MessageStatus::Done,
        }
    }

    /// Create an empty AI message that is still streaming
    pub fn streaming() -> Self {
        Self {
            speaker: Speaker::System,
            content: String::new(),
            status: MessageStatus::Streaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, MessageStatus::Failed(_))
    }
}

/// Render one message into wrapped lines
fn message_lines(
    msg: &ChatMessage,
    theme: &Theme,
    width: usize,
    spinner_start: Option<Instant>,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let label = Span::styled(msg.speaker.label(), theme.accent_bold());

    match msg.speaker {
        Speaker::User => {
            let content = Span::styled(msg.content.clone(), theme.base_style());
            lines.extend(wrap_spans(vec![content], Some(label), width));
        }
        Speaker::System => {
            if msg.content.is_empty() && msg.is_streaming() {
                let frame = spinner::frame_at(spinner_start.map(|s| s.elapsed()).unwrap_or_default());
                lines.push(Line::from(vec![
                    label,
                    Span::styled(format!("{} processing...", frame), theme.dim_style()),
                ]));
            } else {
                lines.push(Line::from(label));
                let content_width = width.saturating_sub(2);
                for line in render_markdown(&msg.content, theme, content_width) {
                    let mut spans = vec![Span::raw("  ")];
                    spans.extend(line.spans);
                    lines.push(Line::from(spans));
                }
                if msg.is_streaming() {
                    if let Some(last) = lines.last_mut() {
                        last.spans.push(Span::styled("▌", theme.accent_style()));
                    }
                }
            }
        }
    }

    if let MessageStatus::Failed(reason) = &msg.status {
        let marker = Span::styled(
            "[ERROR] ",
            theme.error_style().add_modifier(Modifier::BOLD),
        );
        let reason = Span::styled(reason.clone(), theme.error_style());
        lines.extend(wrap_spans(vec![reason], Some(marker), width));
    }

    // Separator
    lines.push(Line::from(""));
    lines
}

/// Total rendered height of `messages` at `width`
pub fn content_height(messages: &[ChatMessage], theme: &Theme, width: usize) -> usize {
    messages
        .iter()
        .map(|m| message_lines(m, theme, width, None).len())
        .sum()
}

/// Widget for displaying the transcript
pub struct MessageList<'a> {
    messages: &'a [ChatMessage],
    theme: &'a Theme,
    scroll: usize,
    spinner_start: Option<Instant>,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [ChatMessage], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
            spinner_start: None,
        }
    }

    /// Set scroll offset in lines
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Start time for the waiting indicator animation
    pub fn spinner_start(mut self, start: Instant) -> Self {
        self.spinner_start = Some(start);
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let visible: Vec<Line> = self
            .messages
            .iter()
            .flat_map(|m| message_lines(m, self.theme, width, self.spinner_start))
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_user_label_inline() {
        let theme = Theme::default();
        let lines = message_lines(&ChatMessage::user("a world of glass"), &theme, 40, None);
        assert_eq!(text(&lines), vec!["USER: a world of glass", ""]);
    }

    #[test]
    fn test_system_reply_indented() {
        let theme = Theme::default();
        let lines = message_lines(&ChatMessage::system("Reality Overview"), &theme, 40, None);
        assert_eq!(text(&lines), vec!["SYSTEM: ", "  Reality Overview", ""]);
    }

    #[test]
    fn test_streaming_placeholder() {
        let theme = Theme::default();
        let lines = message_lines(&ChatMessage::streaming(), &theme, 40, None);
        let rendered = text(&lines);
        assert!(rendered[0].starts_with("SYSTEM: "));
        assert!(rendered[0].ends_with("processing..."));

        let mut partial = ChatMessage::streaming();
        partial.content = "half".into();
        let rendered = text(&message_lines(&partial, &theme, 40, None));
        assert_eq!(rendered[1], "  half▌");
    }

    #[test]
    fn test_failed_reply_shows_error_record() {
        let theme = Theme::default();
        let msg = ChatMessage {
            speaker: Speaker::System,
            content: "partial".into(),
            status: MessageStatus::Failed("connection reset".into()),
        };
        let lines = message_lines(&msg, &theme, 40, None);
        let rendered = text(&lines);
        assert!(rendered.contains(&"  partial".to_string()));
        assert!(rendered.contains(&"[ERROR] connection reset".to_string()));

        let error_line = lines
            .iter()
            .find(|l| l.spans.iter().any(|s| s.content == "[ERROR] "))
            .unwrap();
        assert_eq!(error_line.spans[0].style.fg, Some(theme.error));
    }

    #[test]
    fn test_content_height_matches_render() {
        let theme = Theme::default();
        let messages = vec![
            ChatMessage::user("tell me about a world where gravity runs sideways"),
            ChatMessage::system("## Reality Overview\n\nEverything falls east."),
        ];
        let expected: usize = messages
            .iter()
            .map(|m| message_lines(m, &theme, 20, None).len())
            .sum();
        assert_eq!(content_height(&messages, &theme, 20), expected);
        assert!(expected > 6);
    }
}
