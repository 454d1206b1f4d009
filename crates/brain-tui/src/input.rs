//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Regular character input
    Char(char),
    /// Enter/submit
    Submit,
    /// Backspace
    Backspace,
    /// Delete
    Delete,
    /// Move cursor left
    Left,
    /// Move cursor right
    Right,
    /// Move to start of line
    Home,
    /// Move to end of line
    End,
    /// Page up
    PageUp,
    /// Page down
    PageDown,
    /// Escape
    Escape,
    /// Ctrl+C (interrupt)
    Interrupt,
    /// Ctrl+L (clear the status log)
    Clear,
    /// Ctrl+U (clear line)
    ClearLine,
    /// Ctrl+W (delete word)
    DeleteWord,
    /// Paste (bracketed paste)
    Paste(String),
    /// Unknown/unhandled
    Unknown,
}

impl Action {
    /// Whether this action ends the session
    pub fn is_quit(&self) -> bool {
        matches!(self, Action::Interrupt | Action::Escape)
    }
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code,
        modifiers,
        kind,
        ..
    } = event;

    // Windows reports releases too
    if kind == KeyEventKind::Release {
        return Action::Unknown;
    }

    // Handle Ctrl combinations first
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('l') => Action::Clear,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}
