//! Character-by-character text reveal

use std::time::{Duration, Instant};

/// Default delay between revealed characters
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

/// Reveals `text` one character per interval from a start instant
#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    char_count: usize,
    interval: Duration,
    started: Instant,
    skipped: bool,
}

impl Typewriter {
    pub fn new(text: impl Into<String>, started: Instant) -> Self {
        let text = text.into();
        Self {
            char_count: text.chars().count(),
            text,
            interval: DEFAULT_INTERVAL,
            started,
            skipped: false,
        }
    }

    /// Set the per-character delay
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Number of characters visible at `now`
    pub fn revealed(&self, now: Instant) -> usize {
        if self.skipped || self.interval.is_zero() {
            return self.char_count;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let steps = elapsed.as_millis() / self.interval.as_millis().max(1);
        (steps as usize).min(self.char_count)
    }

    /// The visible prefix of the text at `now`
    pub fn visible(&self, now: Instant) -> &str {
        let count = self.revealed(now);
        match self.text.char_indices().nth(count) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    pub fn is_done(&self, now: Instant) -> bool {
        self.revealed(now) >= self.char_count
    }

    /// Reveal everything immediately
    pub fn fast_forward(&mut self) {
        self.skipped = true;
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
