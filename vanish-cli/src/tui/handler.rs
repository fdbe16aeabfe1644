use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use vanish_core::Phase;

use crate::app::Action;

/// Map key events to actions based on the workflow phase
pub fn handle_key(key: KeyEvent, phase: Phase) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return if phase.is_terminal() {
            Action::Acknowledge
        } else {
            Action::Cancel
        };
    }

    match phase {
        Phase::Confirming => handle_key_confirming(key),
        Phase::Done | Phase::Error | Phase::Cancelled => handle_key_finished(key),
        _ => handle_key_working(key),
    }
}

fn handle_key_confirming(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Action::Confirm,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Char('q') | KeyCode::Esc => {
            Action::Decline
        }
        KeyCode::Up | KeyCode::Char('k') => Action::ScrollUp,
        KeyCode::Down | KeyCode::Char('j') => Action::ScrollDown,
        _ => Action::Tick,
    }
}

fn handle_key_working(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Cancel,
        _ => Action::Tick,
    }
}

fn handle_key_finished(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter | KeyCode::Char('q') | KeyCode::Esc | KeyCode::Char(' ') => {
            Action::Acknowledge
        }
        _ => Action::Tick,
    }
}
