//! Sequence analysis bar for the DNA BLOOD ANALYSIS panel

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
    widgets::Widget,
};
use std::time::{Duration, Instant};

/// Default time for the bar to fill
pub const FILL_DURATION: Duration = Duration::from_secs(2);
/// Default time the SUCCESS status is held before the bar resets
pub const HOLD_DURATION: Duration = Duration::from_secs(2);

/// Where the sequence animation is at a given instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeqPhase {
    /// Reset: empty bar
    Idle,
    /// Filling; holds the ratio in `0.0..1.0`
    Analyzing(f64),
    /// Full bar
    Success,
}

impl SeqPhase {
    pub fn status(&self) -> &'static str {
        match self {
            SeqPhase::Success => "SUCCESS",
            SeqPhase::Idle | SeqPhase::Analyzing(_) => "ANALYZING",
        }
    }

    pub fn ratio(&self) -> f64 {
        match self {
            SeqPhase::Idle => 0.0,
            SeqPhase::Analyzing(r) => *r,
            SeqPhase::Success => 1.0,
        }
    }
}

/// Fill / hold / reset cycle started by each submission.
///
/// Starting again while a cycle runs restarts it from an empty bar.
#[derive(Debug, Clone)]
pub struct SeqAnimation {
    fill: Duration,
    hold: Duration,
    started: Option<Instant>,
}

impl Default for SeqAnimation {
    fn default() -> Self {
        Self::new(FILL_DURATION, HOLD_DURATION)
    }
}

impl SeqAnimation {
    pub fn new(fill: Duration, hold: Duration) -> Self {
        Self {
            fill,
            hold,
            started: None,
        }
    }

    /// Start (or restart) the cycle at `now`
    pub fn start(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn phase(&self, now: Instant) -> SeqPhase {
        let Some(started) = self.started else {
            return SeqPhase::Idle;
        };
        let elapsed = now.saturating_duration_since(started);
        if elapsed < self.fill {
            SeqPhase::Analyzing(elapsed.as_secs_f64() / self.fill.as_secs_f64())
        } else if elapsed < self.fill + self.hold {
            SeqPhase::Success
        } else {
            SeqPhase::Idle
        }
    }

    /// Whether a cycle is still running at `now`
    pub fn is_active(&self, now: Instant) -> bool {
        self.phase(now) != SeqPhase::Idle
    }
}

/// `SEQ: <status>` line over a horizontal bar
pub struct SeqBar<'a> {
    phase: SeqPhase,
    theme: &'a Theme,
}

impl<'a> SeqBar<'a> {
    pub fn new(phase: SeqPhase, theme: &'a Theme) -> Self {
        Self { phase, theme }
    }
}

impl Widget for SeqBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let status_style = match self.phase {
            SeqPhase::Success => self.theme.success_style().add_modifier(Modifier::BOLD),
            _ => self.theme.base_style(),
        };
        let label = format!("SEQ: {}", self.phase.status());
        buf.set_span(area.x, area.y, &Span::styled(label, status_style), area.width);

        if area.height < 2 {
            return;
        }
        let y = area.y + area.height.min(3) - 1;
        let percent = format!(" {:>3}%", (self.phase.ratio() * 100.0).round() as u32);
        let bar_width = area.width.saturating_sub(percent.len() as u16) as usize;
        let filled = ((bar_width as f64) * self.phase.ratio()).round() as usize;

        let filled_span = Span::styled("█".repeat(filled), Style::default().fg(self.theme.gauge));
        let track_span = Span::styled(
            "░".repeat(bar_width - filled),
            Style::default().fg(self.theme.gauge_track),
        );
        buf.set_span(area.x, y, &filled_span, area.width);
        buf.set_span(area.x + filled as u16, y, &track_span, area.width);
        buf.set_span(
            area.x + bar_width as u16,
            y,
            &Span::styled(percent, self.theme.dim_style()),
            area.width.saturating_sub(bar_width as u16),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_before_start() {
        let anim = SeqAnimation::default();
        let phase = anim.phase(Instant::now());
        assert_eq!(phase, SeqPhase::Idle);
        assert_eq!(phase.status(), "ANALYZING");
        assert_eq!(phase.ratio(), 0.0);
    }

    #[test]
    fn test_fill_hold_reset() {
        let mut anim = SeqAnimation::default();
        let t0 = Instant::now();
        anim.start(t0);

        assert_eq!(anim.phase(t0), SeqPhase::Analyzing(0.0));
        let half = anim.phase(t0 + Duration::from_secs(1));
        assert!((half.ratio() - 0.5).abs() < 1e-9);
        assert_eq!(half.status(), "ANALYZING");

        let done = anim.phase(t0 + Duration::from_millis(2500));
        assert_eq!(done, SeqPhase::Success);
        assert_eq!(done.ratio(), 1.0);
        assert!(anim.is_active(t0 + Duration::from_millis(3999)));

        assert_eq!(anim.phase(t0 + Duration::from_secs(4)), SeqPhase::Idle);
        assert!(!anim.is_active(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_restart_during_cycle() {
        let mut anim = SeqAnimation::default();
        let t0 = Instant::now();
        anim.start(t0);
        let t1 = t0 + Duration::from_millis(2500);
        assert_eq!(anim.phase(t1), SeqPhase::Success);

        anim.start(t1);
        assert_eq!(anim.phase(t1), SeqPhase::Analyzing(0.0));
        assert_eq!(anim.phase(t1 + Duration::from_secs(3)), SeqPhase::Success);
    }

    #[test]
    fn test_bar_render() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 25, 2);
        let mut buf = Buffer::empty(area);
        SeqBar::new(SeqPhase::Analyzing(0.5), &theme).render(area, &mut buf);

        let row = |y: u16| -> String {
            (0..25)
                .map(|x| buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "))
                .collect()
        };
        assert!(row(0).starts_with("SEQ: ANALYZING"));
        let bar = row(1);
        assert_eq!(bar.matches('█').count(), 10);
        assert!(bar.ends_with(" 50%"));
    }
}
