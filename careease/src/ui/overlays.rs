//! Modal forms, the delete confirmation and toasts.
//!
//! Everything here is drawn after the panels, on top of a `Clear`.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{AlarmField, AppState, NewChatField, ReviewField, ToastLevel};
use crate::theme::Theme;

const FORM_WIDTH: u16 = 60;

fn modal_area(frame: &Frame, height: u16) -> Rect {
    let area = frame.area();
    area.centered(
        Constraint::Length(FORM_WIDTH.min(area.width)),
        Constraint::Length(height.min(area.height)),
    )
}

fn modal_block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::bordered()
        .title(title)
        .border_style(Style::default().fg(theme.border_active))
}

/// `label: value` row, highlighted when the field has focus.
fn field_line(label: &str, value: String, focused: bool, theme: &Theme) -> Line<'static> {
    let label_style = if focused {
        Style::default()
            .fg(theme.border_active)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.muted)
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:>12}: "), label_style),
        Span::styled(format!("{value}{cursor}"), Style::default().fg(theme.text)),
    ])
}

pub fn render_new_chat_form(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let form = &state.new_chat;
    let area = modal_area(frame, 9);
    frame.render_widget(Clear, area);

    let lines = vec![
        field_line("Title", form.title.clone(), form.field == NewChatField::Title, theme),
        field_line("Issue", form.issue.clone(), form.field == NewChatField::Issue, theme),
        field_line(
            "Category",
            format!("< {} >", form.category.label()),
            form.field == NewChatField::Category,
            theme,
        ),
        field_line(
            "Priority",
            format!("< {} >", form.priority.label()),
            form.field == NewChatField::Priority,
            theme,
        ),
        Line::raw(""),
        Line::styled(
            "Tab next field, Left/Right change, Enter create, Esc cancel",
            Style::default().fg(theme.muted),
        ),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .block(modal_block(" New chat ", theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

pub fn render_review_form(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let form = &state.review;
    let area = modal_area(frame, 7);
    let title = match state.review_chat_title() {
        Some(chat) => format!(" Review \"{chat}\" "),
        None => " Review this chat ".to_owned(),
    };
    frame.render_widget(Clear, area);

    let stars: String = (1..=5u8)
        .map(|i| if i <= form.rating { '★' } else { '☆' })
        .collect();
    let lines = vec![
        field_line(
            "Rating",
            format!("{stars} ({}/5)", form.rating),
            form.field == ReviewField::Rating,
            theme,
        ),
        field_line(
            "Feedback",
            form.feedback.clone(),
            form.field == ReviewField::Feedback,
            theme,
        ),
        Line::raw(""),
        Line::styled(
            "1-5 or Left/Right rate, Tab feedback, Enter submit, Esc cancel",
            Style::default().fg(theme.muted),
        ),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .block(modal_block(&title, theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

pub fn render_alarm_form(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let form = &state.new_alarm;
    let area = modal_area(frame, 8);
    frame.render_widget(Clear, area);

    let lines = vec![
        field_line("Name", form.name.clone(), form.field == AlarmField::Name, theme),
        field_line("Time", form.time.clone(), form.field == AlarmField::Time, theme),
        field_line(
            "Description",
            form.description.clone(),
            form.field == AlarmField::Description,
            theme,
        ),
        Line::raw(""),
        Line::styled(
            "Time is local, YYYY-MM-DD HH:MM. Enter create, Esc cancel",
            Style::default().fg(theme.muted),
        ),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .block(modal_block(" New alarm ", theme))
            .wrap(Wrap { trim: false }),
        area,
    );
}

pub fn render_confirm_delete(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let Some(target) = &state.pending_delete else {
        return;
    };
    let area = modal_area(frame, 5);
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::raw(format!("Delete {}?", target.describe())),
        Line::styled("y delete, n cancel", Style::default().fg(theme.muted)),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::bordered()
                    .title(" Confirm ")
                    .border_style(Style::default().fg(theme.toast_error)),
            )
            .wrap(Wrap { trim: true }),
        area,
    );
}

/// Stacks toasts in the top-right corner, newest at the bottom.
pub fn render_toasts(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let area = frame.area();
    let width = 44.min(area.width);
    let mut y = area.y + 1;

    for toast in &state.toasts {
        let color = match toast.level {
            ToastLevel::Info => theme.toast_info,
            ToastLevel::Success => theme.toast_success,
            ToastLevel::Error => theme.toast_error,
            ToastLevel::Alarm => theme.toast_alarm,
        };
        let inner_width = width.saturating_sub(2).max(1) as usize;
        let rows = toast.text.chars().count().div_ceil(inner_width).max(1) as u16;
        let height = rows + 2;
        if y + height > area.bottom() {
            break;
        }
        let rect = Rect {
            x: area.right().saturating_sub(width + 1),
            y,
            width,
            height,
        };
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(toast.text.clone())
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true })
                .block(Block::bordered().border_style(Style::default().fg(color))),
            rect,
        );
        y += height;
    }
}
