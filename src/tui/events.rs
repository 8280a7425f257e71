//! Event Handling - Keyboard input processing

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions that can be triggered by user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextField,
    PrevField,
    NextForm,
    PrevForm,
    AddForm,
    RemoveForm,
    Submit,
    Cancel,
    Input(char),
    Backspace,
    Help,
    None,
}

/// Map a key to an action
///
/// Plain characters always go to the selected field, so every command sits
/// behind Ctrl or a non-printing key.
pub fn handle_key_event(key: KeyEvent) -> Action {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c' | 'q')) => Action::Quit,
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => Action::AddForm,
        (KeyModifiers::CONTROL, KeyCode::Char('d')) => Action::RemoveForm,
        (KeyModifiers::CONTROL, KeyCode::Char('s')) => Action::Submit,

        (_, KeyCode::F(1)) => Action::Help,
        (_, KeyCode::Esc) => Action::Cancel,
        (_, KeyCode::Tab) => Action::NextField,
        (_, KeyCode::BackTab) => Action::PrevField,
        (_, KeyCode::Down) => Action::NextForm,
        (_, KeyCode::Up) => Action::PrevForm,
        (_, KeyCode::Backspace) => Action::Backspace,

        (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => Action::Input(c),

        _ => Action::None,
    }
}
