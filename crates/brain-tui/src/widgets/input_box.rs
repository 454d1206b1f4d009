//! Command input widget

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

const SEND_LABEL: &str = " SEND ";

/// Single-line command input
#[derive(Debug, Default)]
pub struct InputBox {
    /// Current input text
    content: String,
    /// Cursor position (character index, not byte index)
    cursor: usize,
    /// Horizontal scroll offset (in display width)
    scroll: usize,
    /// Placeholder text
    placeholder: String,
    /// Placeholder shown while input is disabled
    disabled_placeholder: String,
    /// Whether the input accepts edits
    disabled: bool,
}

impl InputBox {
    /// Create a new input box
    pub fn new() -> Self {
        Self::default()
    }

    /// Set placeholder text
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set the placeholder shown while disabled
    pub fn with_disabled_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.disabled_placeholder = placeholder.into();
        self
    }

    /// Enable or disable editing
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Get the current content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Take the content, leaving the input empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        self.scroll = 0;
        std::mem::take(&mut self.content)
    }

    /// Clear the content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    fn char_byte_offset(&self, index: usize) -> usize {
        self.content
            .char_indices()
            .nth(index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    /// Display width of text before the cursor
    fn cursor_display_width(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    /// Handle an input action. Returns true if the input changed.
    ///
    /// A disabled input ignores every action.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        if self.disabled {
            return false;
        }
        let char_count = self.content.chars().count();

        let changed = match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.remove_char_at(self.cursor);
                true
            }
            Action::Delete if self.cursor < char_count => {
                self.remove_char_at(self.cursor);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < char_count => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = char_count;
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                let start_byte = self.char_byte_offset(start);
                let end_byte = self.char_byte_offset(self.cursor);
                self.content.drain(start_byte..end_byte);
                self.cursor = start;
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        if !self.content.ends_with(' ') && self.cursor > 0 {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                true
            }
            _ => false,
        };

        if changed {
            self.update_scroll(width as usize);
        }
        changed
    }

    fn insert_char(&mut self, c: char) {
        let byte_offset = self.char_byte_offset(self.cursor);
        self.content.insert(byte_offset, c);
        self.cursor += 1;
    }

    fn remove_char_at(&mut self, index: usize) {
        let start = self.char_byte_offset(index);
        let end = self.char_byte_offset(index + 1);
        self.content.drain(start..end);
    }

    fn update_scroll(&mut self, width: usize) {
        // Borders plus the send label
        let visible_width = width.saturating_sub(2 + SEND_LABEL.len()).max(1);
        let cursor_pos = self.cursor_display_width();

        if cursor_pos < self.scroll {
            self.scroll = cursor_pos;
        } else if cursor_pos >= self.scroll + visible_width {
            self.scroll = cursor_pos - visible_width + 1;
        }
    }

    fn visible_text(&self, width: usize) -> String {
        let mut skipped = 0;
        let mut visible = String::new();
        let mut used = 0;
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if skipped < self.scroll {
                skipped += w;
                continue;
            }
            if used + w > width {
                break;
            }
            visible.push(c);
            used += w;
        }
        visible
    }

    /// Render the input box
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.disabled {
                theme.dim_style()
            } else {
                theme.border_style()
            });

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let label_width = (SEND_LABEL.len() as u16).min(inner.width);
        let text_area = Rect {
            width: inner.width - label_width,
            ..inner
        };
        let label_area = Rect {
            x: inner.x + text_area.width,
            width: label_width,
            ..inner
        };

        let (text, style) = if self.disabled {
            (self.disabled_placeholder.clone(), theme.dim_style())
        } else if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            (
                self.visible_text(text_area.width as usize),
                theme.base_style(),
            )
        };
        Paragraph::new(text).style(style).render(text_area, buf);

        let label_style = if self.disabled {
            Style::default().fg(theme.dim)
        } else {
            Style::default()
                .fg(theme.bg)
                .bg(theme.fg)
                .add_modifier(Modifier::BOLD)
        };
        Paragraph::new(Line::from(Span::styled(SEND_LABEL, label_style))).render(label_area, buf);

        if !self.disabled && text_area.width > 0 {
            let cursor_x = self.cursor_display_width().saturating_sub(self.scroll);
            if cursor_x < text_area.width as usize {
                let x = text_area.x + cursor_x as u16;
                if let Some(cell) = buf.cell_mut((x, text_area.y)) {
                    cell.set_style(Style::default().bg(theme.accent).fg(theme.bg));
                }
            }
        }
    }
}
