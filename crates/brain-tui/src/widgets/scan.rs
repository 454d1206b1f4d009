//! Cranial scan panel: a brain outline swept by a scan line

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::Span,
    widgets::Widget,
};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

const BRAIN: &[&str] = &[
    "        _---~~(~~-_.        ",
    "      _{        )   )       ",
    "    ,   ) -~~- ( ,-' )_     ",
    "   (  `-,_..`., )-- '_,)    ",
    "  ( ` _)  (  -~( -_ `,  }   ",
    "  (_-  _  ~_-~~~~`,  ,' )   ",
    "    `~ -^(    __;-,((()))   ",
    "          ~~~~ {_ -_(())    ",
    "                 `\\  }      ",
    "                   { }      ",
];

/// Time for the scan line to move one row
const ROW_DURATION: Duration = Duration::from_millis(120);

/// Row of the sweep after `elapsed`, bouncing between top and bottom
pub fn scan_row(elapsed: Duration, rows: usize) -> usize {
    if rows <= 1 {
        return 0;
    }
    let period = 2 * (rows - 1);
    let step = (elapsed.as_millis() / ROW_DURATION.as_millis()) as usize % period;
    if step < rows { step } else { period - step }
}

/// Animated cranial scan
pub struct CranialScan<'a> {
    theme: &'a Theme,
    elapsed: Duration,
}

impl<'a> CranialScan<'a> {
    /// `elapsed` drives the sweep position
    pub fn new(theme: &'a Theme, elapsed: Duration) -> Self {
        Self { theme, elapsed }
    }
}

impl Widget for CranialScan<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height < 2 {
            return;
        }

        // Bottom row is the status caption
        let art_height = area.height - 1;
        let sweep_rows = art_height as usize;
        let sweep = scan_row(self.elapsed, sweep_rows);

        let art_width = BRAIN[0].width() as u16;
        let top = area.y + art_height.saturating_sub(BRAIN.len() as u16) / 2;
        let left = area.x + area.width.saturating_sub(art_width) / 2;

        for row in 0..art_height {
            let y = area.y + row;
            let distance = (row as usize).abs_diff(sweep);
            let style = match distance {
                0 => Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
                1 => Style::default().fg(self.theme.fg),
                _ => self.theme.dim_style(),
            };

            if distance == 0 {
                let line = "─".repeat(area.width as usize);
                buf.set_span(area.x, y, &Span::styled(line, self.theme.dim_style()), area.width);
            }

            if y >= top {
                if let Some(art) = BRAIN.get((y - top) as usize) {
                    let span = Span::styled(*art, style);
                    buf.set_span(left, y, &span, area.width.saturating_sub(left - area.x));
                }
            }
        }

        let caption = Span::styled("ACTIVE SCANNING", self.theme.dim_style());
        buf.set_span(area.x, area.y + art_height, &caption, area.width);
    }
}
