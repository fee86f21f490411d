/// Popup overlays drawn on top of the terminal.
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::form::{FormField, FormState};

/// Label column width, marker included
const LABEL_COLS: u16 = 22;

/// Keep the last `max` display columns of `s`, prefixed with "…" when cut.
pub fn tail_fit(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut kept = Vec::new();
    let mut used = 0;
    for c in s.chars().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        kept.push(c);
    }
    std::iter::once('…').chain(kept.into_iter().rev()).collect()
}

pub fn draw_task_form(f: &mut Frame, form: &FormState, area: Rect) {
    // Two rows per field (value + hint), one footer row, two borders
    let height = (FormField::ALL.len() as u16 * 2 + 3).min(area.height);
    let width = 72u16.min(area.width.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let popup_area = Rect { x, y, width, height };

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(
            form.heading,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let value_cols = inner.width.saturating_sub(LABEL_COLS).saturating_sub(1) as usize;
    let focused = form.focused_field();
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(FormField::ALL.len() * 2 + 1);

    for field in FormField::ALL {
        let is_focused = field == focused;
        let marker = if is_focused { "›" } else { " " };
        let label_style = if is_focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Rgb(140, 140, 160))
        };
        let value_style = if is_focused {
            Style::default().fg(Color::White).bg(Color::Rgb(24, 24, 36))
        } else {
            Style::default().fg(Color::White)
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!("  {marker} {:<width$}", field.label(), width = LABEL_COLS as usize - 4),
                label_style,
            ),
            Span::styled(tail_fit(form.value(field), value_cols), value_style),
        ]));
        lines.push(Line::from(Span::styled(
            format!("{:pad$}{}", "", field.hint(), pad = LABEL_COLS as usize),
            Style::default().fg(Color::Rgb(70, 70, 90)),
        )));
    }
    lines.push(Line::from(Span::styled(
        "  Tab/↑↓ move · Enter save · Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));

    f.render_widget(Paragraph::new(lines), inner);

    let row = form.focused as u16 * 2;
    if row < inner.height {
        let shown = tail_fit(form.value(focused), value_cols);
        let cursor_x = inner.x + LABEL_COLS + shown.width() as u16;
        if cursor_x < inner.x + inner.width {
            f.set_cursor_position((cursor_x, inner.y + row));
        }
    }
}
