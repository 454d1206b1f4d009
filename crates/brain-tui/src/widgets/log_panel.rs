//! Rolling system status log

use crate::theme::Theme;
use chrono::{Local, NaiveTime};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::collections::VecDeque;

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 200;

/// Entries present when a session starts
pub const BOOT_ENTRIES: [&str; 3] = [
    "System initialized...",
    "Running diagnostics...",
    "All systems operational",
];

/// Bounded log of status lines; the oldest entries are dropped first
#[derive(Debug, Clone)]
pub struct StatusLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StatusLog {
    /// Create a log seeded with the boot entries
    pub fn new(capacity: usize) -> Self {
        let mut log = Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        };
        for entry in BOOT_ENTRIES {
            log.push_raw(entry.to_string());
        }
        log
    }

    /// Append `text` stamped with the local wall-clock time
    pub fn push(&mut self, text: impl AsRef<str>) {
        self.push_at(Local::now().time(), text);
    }

    /// Append `text` stamped with `time`
    pub fn push_at(&mut self, time: NaiveTime, text: impl AsRef<str>) {
        self.push_raw(format!("[{}] {}", time.format("%H:%M:%S"), text.as_ref()));
    }

    fn push_raw(&mut self, entry: String) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Renders the newest entries that fit, oldest at the top
pub struct LogPanel<'a> {
    log: &'a StatusLog,
    theme: &'a Theme,
}

impl<'a> LogPanel<'a> {
    pub fn new(log: &'a StatusLog, theme: &'a Theme) -> Self {
        Self { log, theme }
    }
}

impl Widget for LogPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Wrap from the newest entry backwards until the panel is full
        let height = area.height as usize;
        let mut rows: Vec<String> = Vec::new();
        for entry in self.log.entries.iter().rev() {
            if rows.len() >= height {
                break;
            }
            let wrapped = textwrap::wrap(entry, area.width as usize);
            for row in wrapped.into_iter().rev() {
                rows.push(row.into_owned());
            }
        }
        rows.truncate(height);
        rows.reverse();

        let lines: Vec<Line> = rows
            .into_iter()
            .map(|row| Line::from(Span::styled(row, self.theme.dim_style())))
            .collect();

        Paragraph::new(lines).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_boot_entries_and_format() {
        let mut log = StatusLog::default();
        assert_eq!(log.entries().collect::<Vec<_>>(), BOOT_ENTRIES.to_vec());

        log.push_at(time(9, 5, 3), "Command executed: bend light");
        assert_eq!(
            log.entries().last(),
            Some("[09:05:03] Command executed: bend light")
        );
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = StatusLog::new(5);
        for i in 0..4 {
            log.push_at(time(12, 0, i), format!("entry {}", i));
        }
        assert_eq!(log.len(), 5);
        let entries: Vec<_> = log.entries().collect();
        assert_eq!(entries[0], "All systems operational");
        assert_eq!(entries[4], "[12:00:03] entry 3");
    }

    #[test]
    fn test_clear() {
        let mut log = StatusLog::default();
        log.clear();
        assert!(log.is_empty());
        log.push_at(time(0, 0, 0), "Error: timeout");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_panel_shows_newest() {
        let theme = Theme::default();
        let mut log = StatusLog::default();
        log.push_at(time(1, 2, 3), "Received response from AI");

        let area = Rect::new(0, 0, 40, 2);
        let mut buf = Buffer::empty(area);
        LogPanel::new(&log, &theme).render(area, &mut buf);

        let row = |y: u16| -> String {
            (0..40)
                .map(|x| buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "))
                .collect()
        };
        assert!(row(0).starts_with("All systems operational"));
        assert!(row(1).starts_with("[01:02:03] Received response from AI"));
    }

    #[test]
    fn test_panel_wraps_long_entries() {
        let theme = Theme::default();
        let mut log = StatusLog::new(10);
        log.clear();
        log.push_at(time(1, 2, 3), "AI response completed: Reality Overview...");

        let area = Rect::new(0, 0, 24, 3);
        let mut buf = Buffer::empty(area);
        LogPanel::new(&log, &theme).render(area, &mut buf);

        let row = |y: u16| -> String {
            (0..24)
                .map(|x| buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "))
                .collect::<String>()
                .trim_end()
                .to_string()
        };
        assert_eq!(row(0), "[01:02:03] AI response");
        assert_eq!(row(1), "completed: Reality");
        assert_eq!(row(2), "Overview...");
    }
}
