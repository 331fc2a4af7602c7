//! Help overlay: a centred modal drawn over the panels after a `Clear`.

use ratatui::{
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::Theme;

/// Skipped on terminals narrower than 50 columns.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 50 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(70), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help (j/k scroll, ? or Esc to close) ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text(theme))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text(theme: &Theme) -> Text<'static> {
    let heading = |s: &'static str| {
        Line::styled(
            s,
            Style::default()
                .fg(theme.border_active)
                .add_modifier(Modifier::BOLD),
        )
    };
    Text::from(vec![
        heading("Navigation"),
        Line::from("  Tab / Shift-Tab   Next / previous panel (also L / H)"),
        Line::from("  j / k             Down / up"),
        Line::from("  g / G             Top / bottom"),
        Line::from("  Ctrl-d / Ctrl-u   Half page down / up"),
        Line::from(""),
        heading("Chats"),
        Line::from("  Enter             Open the highlighted chat"),
        Line::from("  n                 New chat"),
        Line::from("  R / A             Mark resolved / archived"),
        Line::from("  v                 Review the chat (rating 1-5)"),
        Line::from("  d                 Delete (asks first)"),
        Line::from(""),
        heading("Conversation"),
        Line::from("  i / Enter         Write a message"),
        Line::from("  Enter             Send (while writing)"),
        Line::from("  Esc               Stop writing"),
        Line::from(""),
        heading("Alarms"),
        Line::from("  a                 New alarm (time as YYYY-MM-DD HH:MM)"),
        Line::from("  Space             Activate / deactivate"),
        Line::from("  c                 Mark completed"),
        Line::from("  d                 Delete (asks first)"),
        Line::from(""),
        heading("Dashboard"),
        Line::from("  D                 Open stats and chats awaiting a rating"),
        Line::from("  Enter / v         Rate the highlighted chat"),
        Line::from("  r                 Reload"),
        Line::from(""),
        heading("General"),
        Line::from("  r / F5            Refresh"),
        Line::from("  t                 Toggle light / dark theme"),
        Line::from("  ?                 Open / close this help"),
        Line::from("  q / Esc / Ctrl-c  Quit"),
    ])
}
