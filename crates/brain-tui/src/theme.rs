//! Color theme support

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Primary text color
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (titles, labels, the cursor)
    pub accent: Color,
    /// Error color
    pub error: Color,
    /// Success color
    pub success: Color,
    /// Warning color
    pub warning: Color,
    /// Border color
    pub border: Color,
    /// Filled part of gauges
    pub gauge: Color,
    /// Unfilled part of gauges
    pub gauge_track: Color,
    /// Code/preformatted text color
    pub code: Color,
    /// Link color
    pub link: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::terminal()
    }
}

impl Theme {
    /// Green-on-black phosphor theme (default)
    pub fn terminal() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::Green,
            dim: Color::Rgb(0, 110, 0),
            accent: Color::LightGreen,
            error: Color::Red,
            success: Color::LightGreen,
            warning: Color::Yellow,
            border: Color::Rgb(0, 140, 0),
            gauge: Color::Green,
            gauge_track: Color::Rgb(0, 50, 0),
            code: Color::LightGreen,
            link: Color::LightGreen,
        }
    }

    /// Dark theme for terminals without true color
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
            gauge: Color::Cyan,
            gauge_track: Color::DarkGray,
            code: Color::Magenta,
            link: Color::Blue,
        }
    }

    /// Look up a theme by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "terminal" | "green" => Some(Self::terminal()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }

    /// Get base style
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get dimmed style
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    /// Get accent style
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Get bold accent style
    pub fn accent_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Get error style
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Get success style
    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    /// Get border style
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Style for a panel title
    pub fn title_style(&self) -> Style {
        Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        assert_eq!(Theme::by_name("green").map(|t| t.fg), Some(Color::Green));
        assert_eq!(Theme::by_name("dark").map(|t| t.fg), Some(Color::White));
        assert!(Theme::by_name("solarized").is_none());
    }
}
