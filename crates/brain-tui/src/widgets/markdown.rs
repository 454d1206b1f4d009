//! Markdown rendering for terminal UI
//!
//! Replies come back as loosely formatted markdown (headings for each
//! section, lists, the occasional code block). Lines are wrapped here, so
//! the number of returned lines is the rendered height.

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

/// Convert markdown text to styled, wrapped ratatui lines
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut out = Renderer {
        lines: Vec::new(),
        current: Vec::new(),
        prefix: None,
        width,
    };
    let mut style = theme.base_style();
    let mut in_code_block = false;
    let mut code_block = String::new();
    let mut list_depth: usize = 0;

    for event in Parser::new(text) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    out.flush();
                    style = match level {
                        HeadingLevel::H1 => theme
                            .accent_style()
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                        HeadingLevel::H2 => theme.accent_bold(),
                        _ => theme.accent_style(),
                    };
                }
                Tag::Paragraph => {
                    if !out.current.is_empty() {
                        out.flush();
                    }
                }
                Tag::CodeBlock(_) => {
                    out.flush();
                    in_code_block = true;
                    code_block.clear();
                }
                Tag::List(_) => list_depth += 1,
                Tag::Item => {
                    out.flush();
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    out.prefix = Some(Span::styled(format!("{}• ", indent), theme.dim_style()));
                }
                Tag::Emphasis => style = style.add_modifier(Modifier::ITALIC),
                Tag::Strong => style = style.add_modifier(Modifier::BOLD),
                Tag::Strikethrough => style = style.add_modifier(Modifier::CROSSED_OUT),
                Tag::Link { .. } => {
                    style = Style::default()
                        .fg(theme.link)
                        .add_modifier(Modifier::UNDERLINED)
                }
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    out.flush();
                    style = theme.base_style();
                }
                TagEnd::Paragraph => {
                    out.flush();
                    out.blank();
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    let code_style = Style::default().fg(theme.code).add_modifier(Modifier::DIM);
                    for code_line in code_block.lines() {
                        let clipped = clip(code_line, width.saturating_sub(3));
                        out.lines
                            .push(Line::from(Span::styled(format!("  {}", clipped), code_style)));
                    }
                    out.blank();
                }
                TagEnd::List(_) => {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        out.blank();
                    }
                }
                TagEnd::Item => out.flush(),
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    style = theme.base_style();
                }
                _ => {}
            },
            Event::Text(text) => {
                if in_code_block {
                    code_block.push_str(&text);
                } else {
                    out.current.push(Span::styled(text.into_string(), style));
                }
            }
            Event::Code(code) => {
                let code_style = Style::default().fg(theme.code).add_modifier(Modifier::BOLD);
                out.current.push(Span::styled(format!("`{}`", code), code_style));
            }
            Event::SoftBreak => out.current.push(Span::styled(" ", style)),
            Event::HardBreak => out.flush(),
            Event::Rule => {
                out.flush();
                out.lines.push(Line::from(Span::styled(
                    "─".repeat(width.min(40)),
                    theme.dim_style(),
                )));
            }
            _ => {}
        }
    }

    out.flush();

    let mut lines = out.lines;
    while lines.last().is_some_and(is_blank) {
        lines.pop();
    }
    lines
}

struct Renderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    /// Bullet for the first wrapped line of a list item
    prefix: Option<Span<'static>>,
    width: usize,
}

impl Renderer {
    fn flush(&mut self) {
        let prefix = self.prefix.take();
        if self.current.is_empty() {
            if let Some(prefix) = prefix {
                self.lines.push(Line::from(prefix));
            }
            return;
        }
        let spans = std::mem::take(&mut self.current);
        self.lines.extend(wrap_spans(spans, prefix, self.width));
    }

    fn blank(&mut self) {
        if !self.lines.last().is_some_and(is_blank) {
            self.lines.push(Line::from(""));
        }
    }
}

fn is_blank(line: &Line<'_>) -> bool {
    line.spans.iter().all(|s| s.content.trim().is_empty())
}

/// Greedy word wrap that keeps span styles.
///
/// Continuation lines are indented to line up with the text after `prefix`.
pub fn wrap_spans(
    spans: Vec<Span<'static>>,
    prefix: Option<Span<'static>>,
    width: usize,
) -> Vec<Line<'static>> {
    let indent = prefix.as_ref().map(|p| p.content.width()).unwrap_or(0);
    let mut lines = Vec::new();
    let mut line: Vec<Span<'static>> = prefix.into_iter().collect();
    let mut used = indent;

    for span in spans {
        let style = span.style;
        for word in split_keep_spaces(&span.content) {
            let word_width = word.width();
            let is_space = word.trim().is_empty();

            if used + word_width > width && used > indent {
                lines.push(Line::from(std::mem::take(&mut line)));
                used = indent;
                if indent > 0 {
                    line.push(Span::raw(" ".repeat(indent)));
                }
                if is_space {
                    continue;
                }
            }

            if word_width > width.saturating_sub(indent) && !is_space {
                // Hard-break words longer than a full line
                let mut chunk = String::new();
                for c in word.chars() {
                    let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
                    if used + cw > width && used > indent {
                        line.push(Span::styled(std::mem::take(&mut chunk), style));
                        lines.push(Line::from(std::mem::take(&mut line)));
                        used = indent;
                        if indent > 0 {
                            line.push(Span::raw(" ".repeat(indent)));
                        }
                    }
                    chunk.push(c);
                    used += cw;
                }
                if !chunk.is_empty() {
                    line.push(Span::styled(chunk, style));
                }
                continue;
            }

            line.push(Span::styled(word.to_string(), style));
            used += word_width;
        }
    }

    if !line.is_empty() {
        lines.push(Line::from(line));
    }
    lines
}

/// Split text into alternating runs of spaces and non-spaces
fn split_keep_spaces(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in text.char_indices() {
        let space = c == ' ';
        match in_space {
            Some(prev) if prev != space => {
                parts.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

fn clip(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + cw + 1 > width {
            break;
        }
        out.push(c);
        used += cw;
    }
    out.push('…');
    out
}
