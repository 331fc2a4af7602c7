//! UI rendering for careease.
//!
//! `render()` is the single entry point, called from the event loop's
//! `terminal.draw()` closure. Layout arithmetic lives in `layout.rs`; each
//! panel and overlay has its own module.

pub(crate) mod layout;
mod alarms;
mod chat_list;
mod dashboard;
mod help;
mod overlays;
mod transcript_view;
pub mod keybindings;

use ratatui::Frame;

use crate::app::{AppState, Mode};
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one complete frame: panels, status bar, then whatever overlay the
/// current mode asks for, with toasts on top of everything.
///
/// Panel rects and viewport heights are written back into `state` so the next
/// keypress or mouse click can use them.
pub fn render(frame: &mut Frame, state: &mut AppState) {
    let theme = state.theme.clone();
    let [chats, transcript, alarms, status_bar] = compute_layout(frame, state.focus);

    state.panel_rects = [chats, transcript, alarms];
    state.chat_list_viewport_height = inner_rect(chats).height;
    state.alarm_list_viewport_height = inner_rect(alarms).height;

    if chats.width > 0 {
        chat_list::render_chat_list(frame, chats, state, &theme);
    }
    if transcript.width > 0 {
        transcript_view::render_transcript(frame, transcript, state, &theme);
    }
    if alarms.width > 0 {
        alarms::render_alarms(frame, alarms, state, &theme);
    }

    render_status_bar(frame, status_bar, state, &theme);

    match state.mode {
        Mode::NewChat => overlays::render_new_chat_form(frame, state, &theme),
        Mode::Review => {
            if state.review_returns_to_dashboard() {
                dashboard::render_dashboard(frame, state, &theme);
            }
            overlays::render_review_form(frame, state, &theme);
        }
        Mode::NewAlarm => overlays::render_alarm_form(frame, state, &theme),
        Mode::ConfirmDelete => overlays::render_confirm_delete(frame, state, &theme),
        Mode::Help => help::render_help_overlay(frame, &theme, state.help_scroll),
        Mode::Dashboard => dashboard::render_dashboard(frame, state, &theme),
        Mode::Normal | Mode::Compose => {}
    }

    overlays::render_toasts(frame, state, &theme);
}
