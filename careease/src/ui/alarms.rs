//! Alarms panel.

use chrono::{Local, Utc};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

use careease_core::types::Alarm;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

pub fn render_alarms(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::Alarms;
    let pending = state
        .alarms
        .iter()
        .filter(|a| a.is_active && !a.is_completed)
        .count();
    let block = panel_block(format!(" Alarms ({pending}) "), is_focused, theme);

    let now = Utc::now();
    let items: Vec<ListItem> = if state.alarms.is_empty() {
        vec![ListItem::new(
            Line::raw("No alarms. Press a to add one.").style(Style::default().fg(theme.muted)),
        )]
    } else {
        state
            .alarms
            .iter()
            .map(|a| alarm_item(a, a.is_due(now), theme))
            .collect()
    };

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .fg(theme.border_active)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, area, &mut state.alarm_list_state);
}

fn alarm_item(alarm: &Alarm, due: bool, theme: &Theme) -> ListItem<'static> {
    let (badge, color) = if alarm.is_completed {
        ("[x] ", theme.muted)
    } else if !alarm.is_active {
        ("[-] ", theme.muted)
    } else if due {
        ("[!] ", theme.toast_alarm)
    } else {
        ("[ ] ", theme.status_active)
    };
    let mut name_style = Style::default().fg(theme.text);
    if alarm.is_completed {
        name_style = name_style.add_modifier(Modifier::CROSSED_OUT);
    }

    let mut lines = vec![
        Line::from(vec![
            Span::styled(badge, Style::default().fg(color)),
            Span::styled(alarm.name.clone(), name_style),
        ]),
        Line::styled(
            format!(
                "    {}",
                alarm.time.with_timezone(&Local).format("%a %b %d %H:%M")
            ),
            Style::default().fg(theme.timestamp),
        ),
    ];
    if let Some(description) = &alarm.description {
        lines.push(Line::styled(
            format!("    {description}"),
            Style::default().fg(theme.muted),
        ));
    }
    ListItem::new(lines)
}
