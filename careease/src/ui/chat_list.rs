//! Chat list panel.
//!
//! One row per chat: status dot, title, priority, and last activity. The
//! open chat is marked with `>`.

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

use careease_core::types::{ChatSession, ChatStatus};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

pub fn render_chat_list(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::Chats;
    let title = if state.chats.is_empty() {
        " Chats ".to_owned()
    } else {
        format!(" Chats ({}) ", state.chats.len())
    };
    let block = panel_block(title, is_focused, theme);

    let open_id = state.transcript.chat_id().map(str::to_owned);
    let items: Vec<ListItem> = if state.chats.is_empty() {
        let msg = if state.chats_loading {
            "Loading..."
        } else {
            "No chats yet. Press n to start one."
        };
        vec![ListItem::new(Line::raw(msg).style(Style::default().fg(theme.muted)))]
    } else {
        state
            .chats
            .iter()
            .map(|c| chat_item(c, open_id.as_deref() == Some(c.id.as_str()), theme))
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(theme.border_active)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(list, area, &mut state.chat_list_state);
}

fn chat_item(chat: &ChatSession, is_open: bool, theme: &Theme) -> ListItem<'static> {
    let marker = if is_open { "> " } else { "  " };
    let dot = match chat.status {
        ChatStatus::Active => "● ",
        ChatStatus::Resolved => "✓ ",
        ChatStatus::Archived => "○ ",
    };
    let title = Line::from(vec![
        Span::raw(marker),
        Span::styled(dot, Style::default().fg(theme.status_color(chat.status))),
        Span::styled(chat.title.clone(), Style::default().fg(theme.text)),
    ]);

    let mut meta = vec![
        Span::raw("    "),
        Span::styled(
            chat.priority.label(),
            Style::default().fg(theme.priority_color(chat.priority)),
        ),
        Span::styled(
            format!(" · {}", chat.category.label()),
            Style::default().fg(theme.muted),
        ),
    ];
    if let Some(at) = chat.last_activity() {
        meta.push(Span::styled(
            format!(" · {}", format_activity(at)),
            Style::default().fg(theme.timestamp),
        ));
    }
    if chat.review.is_some() {
        meta.push(Span::styled(" · reviewed", Style::default().fg(theme.muted)));
    }

    ListItem::new(vec![title, Line::from(meta)])
}

/// `HH:MM` for today, `Mon DD` otherwise, in local time.
fn format_activity(at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&Local);
    if local.date_naive() == Local::now().date_naive() {
        local.format("%H:%M").to_string()
    } else {
        local.format("%b %d").to_string()
    }
}
