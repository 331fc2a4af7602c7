//! Responsive 3-panel layout.
//!
//! Pure layout arithmetic, recomputed inside every `terminal.draw()`.
//!
//! At `>= 110` columns the chat list, transcript and alarms sit side by side
//! (25 / fill / 25). Narrower terminals show only the focused panel.
//! `Spacing::Overlap(1)` with `MergeStrategy::Fuzzy` lets neighbouring borders
//! share a column.

use ratatui::{
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
    Frame,
};

use crate::app::{AppState, Mode, PanelFocus};
use crate::theme::Theme;

const WIDE_LAYOUT_MIN_WIDTH: u16 = 110;

/// Returns `[chats, transcript, alarms, status_bar]`. Hidden panels get a
/// zero-width rect.
pub fn compute_layout(frame: &Frame, focus: PanelFocus) -> [Rect; 4] {
    let area = frame.area();
    let [main_area, status_bar] =
        area.layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let constraints = if area.width >= WIDE_LAYOUT_MIN_WIDTH {
        [
            Constraint::Percentage(25),
            Constraint::Fill(1),
            Constraint::Percentage(25),
        ]
    } else {
        let shown = |panel: PanelFocus| {
            if panel == focus {
                Constraint::Fill(1)
            } else {
                Constraint::Length(0)
            }
        };
        [
            shown(PanelFocus::Chats),
            shown(PanelFocus::Transcript),
            shown(PanelFocus::Alarms),
        ]
    };
    let horizontal = Layout::horizontal(constraints).spacing(Spacing::Overlap(1));
    let [chats, transcript, alarms] = main_area.layout(&horizontal);

    [chats, transcript, alarms, status_bar]
}

/// The panel area inside its 1-cell border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    })
}

/// Thick border when focused, plain otherwise.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused {
        BorderType::Thick
    } else {
        BorderType::Plain
    };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Mode badge, signed-in user, open chat state and the key hint.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Compose => (" COMPOSE ", theme.status_mode_insert),
        Mode::NewChat | Mode::Review | Mode::NewAlarm => (" FORM ", theme.status_mode_insert),
        Mode::Normal | Mode::Help | Mode::ConfirmDelete | Mode::Dashboard => {
            (" NORMAL ", theme.status_mode_normal)
        }
    };

    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().fg(mode_fg).add_modifier(Modifier::BOLD),
    )];

    let who = match (&state.user, state.signed_in) {
        (_, false) => " signed out ".to_owned(),
        (Some(user), true) => format!(" {} {} ", user.first_name, user.last_name),
        (None, true) => " ".to_owned(),
    };
    spans.push(Span::raw(who));

    if state.transcript.is_sending() {
        spans.push(Span::styled(" sending… ", Style::default().fg(theme.typing)));
    }
    let queued = state.transcript.queued_reveals();
    if queued > 0 {
        spans.push(Span::raw(format!(" +{queued} replies queued ")));
    }
    spans.push(Span::styled(
        " ? help  q quit ",
        Style::default().fg(theme.status_bar_fg),
    ));

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
