//! Transcript panel and message composer.
//!
//! Messages are word-wrapped into owned lines every frame, then only the
//! visible window is handed to the `List`, as with any long scrollback.
//! Scroll-to-bottom requests from the engine pin the viewport to the end.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use careease_core::types::{DisplayMessage, Role};

use crate::app::{AppState, Mode, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Height of the composer box including borders.
const COMPOSER_HEIGHT: u16 = 3;

pub fn render_transcript(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let [messages_area, composer_area] = area.layout(&Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(COMPOSER_HEIGHT),
    ]));

    render_messages(frame, messages_area, state, theme);
    render_composer(frame, composer_area, state, theme);
}

fn render_messages(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::Transcript;
    let title = match state.open_chat() {
        Some(chat) => Line::from(vec![
            Span::raw(format!(" {} ", chat.title)),
            Span::styled(
                format!("[{}] ", chat.status.label()),
                Style::default().fg(theme.status_color(chat.status)),
            ),
        ]),
        None => Line::raw(" Conversation "),
    };
    let block = panel_block(title, is_focused, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);
    state.transcript_viewport_height = inner.height;

    if state.transcript.chat_id().is_none() {
        let hint = Line::raw("Select a chat and press Enter, or press n to start one.")
            .style(Style::default().fg(theme.muted));
        frame.render_widget(Paragraph::new(hint), inner);
        return;
    }
    if state.chat_loading && state.transcript.displayed().is_empty() {
        frame.render_widget(Paragraph::new("Loading messages..."), inner);
        return;
    }

    let width = inner.width.saturating_sub(2).max(1) as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();
    for message in state.transcript.displayed().iter().filter(|m| !m.queued) {
        push_message(&mut lines, message, width, theme);
    }
    if state.typing_indicator() {
        lines.push(Line::styled(
            "CareEase is typing…",
            Style::default()
                .fg(theme.typing)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    let viewport = inner.height as usize;
    let max_scroll = lines.len().saturating_sub(viewport);
    if state.transcript.take_scroll_request() {
        state.follow_transcript = true;
    }
    if state.follow_transcript || state.transcript_scroll >= max_scroll {
        state.follow_transcript = true;
        state.transcript_scroll = max_scroll;
    }

    let end = (state.transcript_scroll + viewport).min(lines.len());
    let items: Vec<ListItem> = lines[state.transcript_scroll..end]
        .iter()
        .cloned()
        .map(ListItem::new)
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn push_message(lines: &mut Vec<Line<'static>>, message: &DisplayMessage, width: usize, theme: &Theme) {
    let (author, color) = match message.role {
        Role::User => ("You", theme.user_message),
        Role::Assistant => ("CareEase", theme.assistant_message),
    };
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    lines.push(Line::from(vec![
        Span::styled(author, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {time}"), Style::default().fg(theme.timestamp)),
    ]));

    let mut body = wrap_text(&message.content, width);
    if message.revealing {
        match body.last_mut() {
            Some(last) => last.push('▌'),
            None => body.push("▌".to_owned()),
        }
    }
    for text in body {
        lines.push(Line::styled(format!("  {text}"), Style::default().fg(color)));
    }
    lines.push(Line::raw(""));
}

/// Greedy word wrap at `width` columns. Explicit newlines are kept; words
/// longer than a line are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0usize;
        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                if line_len > 0 {
                    out.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let rest = chars.split_off(width);
                out.push(chars.into_iter().collect());
                chars = rest;
            }
            if line_len > 0 && line_len + 1 + chars.len() > width {
                out.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line_len += chars.len();
            line.extend(chars);
        }
        out.push(line);
    }
    out
}

fn render_composer(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let composing = state.mode == Mode::Compose;
    let title = if composing {
        " Message (Enter send, Esc done) "
    } else {
        " Message (i to write) "
    };
    let block = panel_block(title, composing, theme);
    let inner = inner_rect(area);

    // Keep the end of a long draft visible.
    let visible: String = {
        let chars: Vec<char> = state.composer.chars().collect();
        let room = (inner.width as usize).saturating_sub(1);
        let start = chars.len().saturating_sub(room);
        chars[start..].iter().collect()
    };
    let text = if state.composer.is_empty() && !composing {
        Line::styled("Type your message...", Style::default().fg(theme.muted))
    } else {
        Line::raw(visible)
    };
    frame.render_widget(Paragraph::new(text).block(block), area);

    if composing && inner.width > 0 {
        let cursor_x = inner.x + (state.composer.chars().count() as u16).min(inner.width - 1);
        frame.set_cursor_position((cursor_x, inner.y));
    }
}
