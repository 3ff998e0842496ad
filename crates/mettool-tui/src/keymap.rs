//! Keyboard shortcut handling.
//!
//! Two modes: normal keys map to [`KeyAction`]s, and while the `:` command
//! line is open keys edit it ([`EditKey`]).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Dashboard actions bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    NextTab,
    PrevTab,
    Run,
    Export,
    Clear,
    Load,
    OpenCommand,
    ToggleLimits,
    ToggleAverage,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Home,
    End,
    None,
}

/// Map a key event to an action.
#[must_use]
pub fn map_key(key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Tab | KeyCode::Right => KeyAction::NextTab,
        KeyCode::BackTab | KeyCode::Left => KeyAction::PrevTab,
        KeyCode::Char('r') | KeyCode::Enter => KeyAction::Run,
        KeyCode::Char('e') => KeyAction::Export,
        KeyCode::Char('x') => KeyAction::Clear,
        KeyCode::Char('L') => KeyAction::Load,
        KeyCode::Char(':') => KeyAction::OpenCommand,
        KeyCode::Char('u') => KeyAction::ToggleLimits,
        KeyCode::Char('a') => KeyAction::ToggleAverage,
        KeyCode::Up => KeyAction::ScrollUp,
        KeyCode::Down => KeyAction::ScrollDown,
        KeyCode::PageUp => KeyAction::PageUp,
        KeyCode::PageDown => KeyAction::PageDown,
        KeyCode::Home => KeyAction::Home,
        KeyCode::End => KeyAction::End,
        _ => KeyAction::None,
    }
}

/// Edits of the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Insert(char),
    Backspace,
    Submit,
    Cancel,
    None,
}

#[must_use]
pub fn map_edit_key(key: KeyEvent) -> EditKey {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => EditKey::Cancel,
        KeyCode::Esc => EditKey::Cancel,
        KeyCode::Enter => EditKey::Submit,
        KeyCode::Backspace => EditKey::Backspace,
        KeyCode::Char(c) => EditKey::Insert(c),
        _ => EditKey::None,
    }
}
