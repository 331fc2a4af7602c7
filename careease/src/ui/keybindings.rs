//! Keybinding dispatcher for careease.
//!
//! Translates crossterm `KeyEvent`s into `AppState` mutations and returns a
//! `KeyAction` telling the event loop whether to continue or quit. Dispatch
//! branches first on `state.mode` so every mode has an isolated handler.

use std::time::Instant;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use careease_core::types::ChatStatus;

use crate::app::{AlarmField, AppState, Mode, NewChatField, PanelFocus, ReviewField};

/// Control-flow signal returned from the key dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    // Ctrl-C always quits, whatever is focused.
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }
    match state.mode {
        Mode::Normal => handle_normal(key, state),
        Mode::Compose => handle_compose(key, state),
        Mode::NewChat => handle_new_chat(key, state),
        Mode::Review => handle_review(key, state),
        Mode::NewAlarm => handle_new_alarm(key, state),
        Mode::Help => handle_help(key, state),
        Mode::ConfirmDelete => handle_confirm_delete(key, state),
        Mode::Dashboard => handle_dashboard(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Char('L') => state.focus = state.focus.next(),
        KeyCode::BackTab | KeyCode::Char('H') => state.focus = state.focus.prev(),

        KeyCode::Enter | KeyCode::Char('l') if state.focus == PanelFocus::Chats => {
            state.open_selected_chat();
        }
        KeyCode::Enter | KeyCode::Char('i') if state.focus == PanelFocus::Transcript => {
            state.start_compose();
        }
        KeyCode::Char(' ') if state.focus == PanelFocus::Alarms => state.toggle_selected_alarm(),
        KeyCode::Char('c') if state.focus == PanelFocus::Alarms => {
            state.complete_selected_alarm();
        }

        KeyCode::Char('n') => state.start_new_chat(),
        KeyCode::Char('a') => state.start_new_alarm(),
        KeyCode::Char('v') => state.start_review(),
        KeyCode::Char('R') => state.set_chat_status(ChatStatus::Resolved),
        KeyCode::Char('A') => state.set_chat_status(ChatStatus::Archived),
        KeyCode::Char('d') | KeyCode::Delete => state.request_delete(),
        KeyCode::Char('r') | KeyCode::F(5) => state.refresh(),
        KeyCode::Char('t') => state.toggle_theme(),
        KeyCode::Char('D') => state.open_dashboard(),

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::Help;
        }
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        _ => {}
    }
    KeyAction::Continue
}

/// j / k / g / G and Ctrl-d / Ctrl-u. `None` lets the key fall through.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::PageDown => state.half_page_down(),
        KeyCode::PageUp => state.half_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// Text input
// ---------------------------------------------------------------------------

/// Applies a printable key or Backspace to `buffer`. Returns `false` for keys
/// that are not text editing.
fn edit_text(buffer: &mut String, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            buffer.push(c);
            true
        }
        KeyCode::Backspace => {
            buffer.pop();
            true
        }
        _ => false,
    }
}

fn handle_compose(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Esc => state.mode = Mode::Normal,
        KeyCode::Enter => state.submit_composer(),
        _ => {
            edit_text(&mut state.composer, key);
        }
    }
    KeyAction::Continue
}

fn handle_new_chat(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let form = &mut state.new_chat;
    match key.code {
        KeyCode::Esc => state.mode = Mode::Normal,
        KeyCode::Enter => state.submit_new_chat(),
        KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
        KeyCode::BackTab | KeyCode::Up => {
            form.field = form.field.next().next().next();
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
            if matches!(form.field, NewChatField::Category | NewChatField::Priority) =>
        {
            let forward = key.code != KeyCode::Left;
            match (form.field, forward) {
                (NewChatField::Category, true) => form.category = form.category.next(),
                (NewChatField::Category, false) => form.category = form.category.prev(),
                (_, true) => form.priority = form.priority.next(),
                (_, false) => form.priority = form.priority.prev(),
            }
        }
        _ => match form.field {
            NewChatField::Title => {
                edit_text(&mut form.title, key);
            }
            NewChatField::Issue => {
                edit_text(&mut form.issue, key);
            }
            NewChatField::Category | NewChatField::Priority => {}
        },
    }
    KeyAction::Continue
}

fn handle_review(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let form = &mut state.review;
    match key.code {
        KeyCode::Esc => state.cancel_review(),
        KeyCode::Enter => state.submit_review(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
            form.field = match form.field {
                ReviewField::Rating => ReviewField::Feedback,
                ReviewField::Feedback => ReviewField::Rating,
            };
        }
        KeyCode::Char(c @ '1'..='5') if form.field == ReviewField::Rating => {
            form.rating = c as u8 - b'0';
        }
        KeyCode::Left if form.field == ReviewField::Rating => {
            form.rating = form.rating.saturating_sub(1).max(1);
        }
        KeyCode::Right if form.field == ReviewField::Rating => {
            form.rating = (form.rating + 1).min(5);
        }
        _ if form.field == ReviewField::Feedback => {
            edit_text(&mut form.feedback, key);
        }
        _ => {}
    }
    KeyAction::Continue
}

fn handle_new_alarm(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let form = &mut state.new_alarm;
    match key.code {
        KeyCode::Esc => state.mode = Mode::Normal,
        KeyCode::Enter => state.submit_new_alarm(Utc::now()),
        KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
        KeyCode::BackTab | KeyCode::Up => form.field = form.field.next().next(),
        _ => {
            let buffer = match form.field {
                AlarmField::Name => &mut form.name,
                AlarmField::Time => &mut form.time,
                AlarmField::Description => &mut form.description,
            };
            edit_text(buffer, key);
        }
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            state.help_scroll = state.help_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.help_scroll = state.help_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

fn handle_dashboard(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.pending_rating_state.select_next(),
        KeyCode::Char('k') | KeyCode::Up => state.pending_rating_state.select_previous(),
        KeyCode::Enter | KeyCode::Char('v') => state.rate_selected_pending(),
        KeyCode::Char('r') | KeyCode::F(5) => state.load_dashboard(Instant::now()),
        KeyCode::Char('D') | KeyCode::Esc | KeyCode::Char('q') => state.close_dashboard(),
        _ => {}
    }
    KeyAction::Continue
}

/// `y` deletes, `n` or Esc cancels. Other keys are ignored.
fn handle_confirm_delete(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => state.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.cancel_delete(),
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Left click focuses a panel; the wheel scrolls the focused panel by 3.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if state.mode == Mode::Normal => {
            let pos = Position {
                x: mouse.column,
                y: mouse.row,
            };
            let [chats, transcript, alarms] = state.panel_rects;
            if chats.width > 0 && chats.contains(pos) {
                state.focus = PanelFocus::Chats;
            } else if transcript.width > 0 && transcript.contains(pos) {
                state.focus = PanelFocus::Transcript;
            } else if alarms.width > 0 && alarms.contains(pos) {
                state.focus = PanelFocus::Alarms;
            }
        }
        MouseEventKind::ScrollUp => {
            if state.mode == Mode::Help {
                state.help_scroll = state.help_scroll.saturating_sub(3);
            } else {
                state.scroll_up(3);
            }
        }
        MouseEventKind::ScrollDown => {
            if state.mode == Mode::Help {
                state.help_scroll = state.help_scroll.saturating_add(3);
            } else {
                state.scroll_down(3);
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::theme::ThemeName;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            handle_key(press(KeyCode::Char(c)), state);
        }
    }

    #[test]
    fn compose_keys_edit_the_buffer_and_esc_leaves() {
        let mut state = AppState::new(ThemeName::Dark, Duration::from_secs(3));
        state.mode = Mode::Compose;
        type_text(&mut state, "Hellp");
        handle_key(press(KeyCode::Backspace), &mut state);
        type_text(&mut state, "o q");
        assert_eq!(state.composer, "Hello q");
        assert_eq!(state.mode, Mode::Compose, "q is text while composing");

        handle_key(press(KeyCode::Esc), &mut state);
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(handle_key(press(KeyCode::Char('q')), &mut state), KeyAction::Quit);
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let mut state = AppState::new(ThemeName::Dark, Duration::from_secs(3));
        state.mode = Mode::NewAlarm;
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(key, &mut state), KeyAction::Quit);
    }

    #[test]
    fn new_chat_form_cycles_fields_and_enums() {
        let mut state = AppState::new(ThemeName::Dark, Duration::from_secs(3));
        handle_key(press(KeyCode::Char('n')), &mut state);
        assert_eq!(state.mode, Mode::NewChat);

        type_text(&mut state, "Sleep");
        handle_key(press(KeyCode::Tab), &mut state);
        type_text(&mut state, "Wakes at night");
        handle_key(press(KeyCode::Tab), &mut state);
        handle_key(press(KeyCode::Right), &mut state);
        handle_key(press(KeyCode::Tab), &mut state);
        handle_key(press(KeyCode::Left), &mut state);

        let form = &state.new_chat;
        assert_eq!(form.title, "Sleep");
        assert_eq!(form.issue, "Wakes at night");
        assert_eq!(form.category, careease_core::types::Category::Medication);
        assert_eq!(form.priority, careease_core::types::Priority::Low);

        handle_key(press(KeyCode::BackTab), &mut state);
        assert_eq!(state.new_chat.field, NewChatField::Category);
    }

    #[test]
    fn review_rating_is_clamped() {
        let mut state = AppState::new(ThemeName::Dark, Duration::from_secs(3));
        state.mode = Mode::Review;
        handle_key(press(KeyCode::Right), &mut state);
        assert_eq!(state.review.rating, 5);
        handle_key(press(KeyCode::Char('2')), &mut state);
        handle_key(press(KeyCode::Left), &mut state);
        handle_key(press(KeyCode::Left), &mut state);
        assert_eq!(state.review.rating, 1);
    }

    #[test]
    fn focus_cycles_with_tab() {
        let mut state = AppState::new(ThemeName::Dark, Duration::from_secs(3));
        handle_key(press(KeyCode::Tab), &mut state);
        assert_eq!(state.focus, PanelFocus::Transcript);
        handle_key(press(KeyCode::BackTab), &mut state);
        handle_key(press(KeyCode::BackTab), &mut state);
        assert_eq!(state.focus, PanelFocus::Alarms);
    }
}
