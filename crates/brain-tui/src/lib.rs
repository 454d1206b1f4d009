//! brain-tui: Terminal UI components
//!
//! Widgets and terminal plumbing for the Brain Terminal screens, built on
//! ratatui and crossterm.

pub mod input;
pub mod terminal;
pub mod theme;
pub mod widgets;

pub use terminal::TerminalGuard;
pub use theme::Theme;
