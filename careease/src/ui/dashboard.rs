//! Dashboard overlay: chat counters, recent chats, tips, and the resolved
//! chats still waiting for a rating.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use careease_core::types::{ChatStats, Dashboard};

use crate::app::AppState;
use crate::theme::Theme;

pub fn render_dashboard(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, area);

    let block = Block::bordered()
        .title(" Dashboard (j/k select, Enter rate, r reload, Esc close) ")
        .border_style(Style::default().fg(theme.border_active));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [stats_area, body] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(inner);
    let [pending_area, side] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);

    match &state.dashboard {
        Some(dashboard) => {
            frame.render_widget(stats_paragraph(&dashboard.stats, theme), stats_area);
            render_side(frame, side, dashboard, theme);
        }
        None => {
            let msg = if state.dashboard_loading {
                "Loading..."
            } else {
                "No data."
            };
            frame.render_widget(
                Paragraph::new(msg).style(Style::default().fg(theme.muted)),
                stats_area,
            );
        }
    }
    render_pending(frame, pending_area, state, theme);
}

fn stat(label: &str, value: String, theme: &Theme) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!("{label}: "), Style::default().fg(theme.muted)),
        Span::styled(
            value,
            Style::default()
                .fg(theme.text)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
    ]
}

fn stats_paragraph(stats: &ChatStats, theme: &Theme) -> Paragraph<'static> {
    let rating = stats
        .average_rating
        .map_or_else(|| "N/A".to_owned(), |r| format!("{r:.1}/5"));
    let response = stats
        .avg_response_time
        .as_ref()
        .map_or_else(|| "N/A".to_owned(), ToString::to_string);

    let mut first = stat("Total chats", stats.total_chats.to_string(), theme);
    first.extend(stat("Active", stats.active_chats.to_string(), theme));
    first.extend(stat("Resolved today", stats.recent_resolved.to_string(), theme));
    let mut second = stat("Average rating", rating, theme);
    second.extend(stat("Response time", response, theme));

    Paragraph::new(vec![Line::from(first), Line::from(second)])
}

fn render_pending(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let title = format!(" Awaiting your rating ({}) ", state.pending_ratings.len());
    let block = Block::bordered()
        .title(title)
        .border_style(Style::default().fg(theme.border_inactive));

    let items: Vec<ListItem> = if state.pending_ratings.is_empty() {
        vec![ListItem::new(
            Line::raw("Nothing to rate.").style(Style::default().fg(theme.muted)),
        )]
    } else {
        state
            .pending_ratings
            .iter()
            .map(|c| {
                ListItem::new(Line::from(vec![
                    Span::styled("★ ", Style::default().fg(theme.toast_alarm)),
                    Span::styled(c.title.clone(), Style::default().fg(theme.text)),
                    Span::styled(
                        format!(" · {}", c.category.label()),
                        Style::default().fg(theme.muted),
                    ),
                ]))
            })
            .collect()
    };

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .fg(theme.border_active)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, area, &mut state.pending_rating_state);
}

fn render_side(frame: &mut Frame, area: Rect, dashboard: &Dashboard, theme: &Theme) {
    let mut lines = vec![Line::styled(
        "Recent chats",
        Style::default()
            .fg(theme.border_active)
            .add_modifier(Modifier::BOLD),
    )];
    if dashboard.recent_chats.is_empty() {
        lines.push(Line::styled(
            "No conversations yet.",
            Style::default().fg(theme.muted),
        ));
    }
    for chat in &dashboard.recent_chats {
        lines.push(Line::from(vec![
            Span::styled(chat.title.clone(), Style::default().fg(theme.text)),
            Span::styled(
                format!(" ({})", chat.status.label()),
                Style::default().fg(theme.status_color(chat.status)),
            ),
        ]));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Daily insights",
        Style::default()
            .fg(theme.border_active)
            .add_modifier(Modifier::BOLD),
    ));
    if dashboard.insights.is_empty() {
        lines.push(Line::styled(
            "Insights appear as you use CareEase.",
            Style::default().fg(theme.muted),
        ));
    }
    for insight in &dashboard.insights {
        lines.push(Line::styled(
            insight.title.clone(),
            Style::default().fg(theme.text),
        ));
        if !insight.content.is_empty() {
            lines.push(Line::styled(
                format!("  {}", insight.content),
                Style::default().fg(theme.muted),
            ));
        }
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::bordered().border_style(Style::default().fg(theme.border_inactive)))
            .wrap(Wrap { trim: false }),
        area,
    );
}
