/// Ratatui draw entry-point for taskterm.
/// Output log, status bar and input box; the task form lives in overlays.rs.
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::AppState;
use crate::output::{LineKind, OutputLine};

pub const SPINNER_GLYPHS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// "  $ " before a command echo, visible width 4
const PROMPT_WIDTH: u16 = 4;

pub fn draw(f: &mut Frame, state: &AppState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // output log
            Constraint::Length(1), // status bar
            Constraint::Length(2), // input box
        ])
        .split(area);

    draw_output(f, state, chunks[0]);
    draw_status_bar(f, state, chunks[1]);
    draw_input(f, state, chunks[2]);

    if let Some(form) = &state.form {
        super::overlays::draw_task_form(f, form, area);
    }
}

// ── Output log ────────────────────────────────────────────────────────────────

fn line_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Command => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        LineKind::Success => Style::default().fg(Color::Rgb(0, 200, 120)),
        LineKind::Error => Style::default().fg(Color::Rgb(230, 80, 80)),
        LineKind::Info => Style::default().fg(Color::Rgb(140, 140, 160)),
    }
}

fn gutter(kind: LineKind) -> Span<'static> {
    match kind {
        LineKind::Command => Span::styled(
            "  $ ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        LineKind::Success => Span::styled("  ✓ ", Style::default().fg(Color::Rgb(0, 160, 90))),
        LineKind::Error => Span::styled("  ✗ ", Style::default().fg(Color::Rgb(200, 60, 60))),
        LineKind::Info => Span::raw("    "),
    }
}

/// Split `text` into rows of at most `width` display columns. Embedded
/// newlines always break; an empty input yields one empty row.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for segment in text.split('\n') {
        let mut row = String::new();
        let mut used = 0;
        for c in segment.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            row.push(c);
            used += w;
        }
        rows.push(row);
    }
    rows
}

/// Range of rows to show given `total` rows, a viewport of `height`
/// and `scroll` rows scrolled up from the bottom.
pub fn visible_window(total: usize, height: usize, scroll: usize) -> (usize, usize) {
    let end = total.saturating_sub(scroll).max(height.min(total));
    let start = end.saturating_sub(height);
    (start, end)
}

fn render_line(line: &OutputLine, width: usize, timestamps: bool) -> Vec<Line<'static>> {
    let stamp = timestamps.then(|| line.at.format("%H:%M:%S ").to_string());
    let stamp_width = stamp.as_deref().map_or(0, UnicodeWidthStr::width);
    let body_width = width.saturating_sub(PROMPT_WIDTH as usize + stamp_width);
    let style = line_style(line.kind);

    wrap_text(&line.text, body_width)
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let mut spans = Vec::with_capacity(3);
            if let Some(s) = &stamp {
                if i == 0 {
                    spans.push(Span::styled(s.clone(), Style::default().fg(Color::DarkGray)));
                } else {
                    spans.push(Span::raw(" ".repeat(stamp_width)));
                }
            }
            spans.push(if i == 0 { gutter(line.kind) } else { Span::raw("    ") });
            spans.push(Span::styled(row, style));
            Line::from(spans)
        })
        .collect()
}

fn draw_output(f: &mut Frame, state: &AppState, area: Rect) {
    let width = area.width as usize;
    let rows: Vec<Line<'static>> = state
        .output
        .lines()
        .iter()
        .flat_map(|l| render_line(l, width, state.show_timestamps))
        .collect();

    let (start, end) = visible_window(rows.len(), area.height as usize, state.output.scroll);
    let visible: Vec<Line<'static>> = rows[start..end].to_vec();
    f.render_widget(Paragraph::new(visible), area);
}

// ── Status bar ────────────────────────────────────────────────────────────────

fn draw_status_bar(f: &mut Frame, state: &AppState, area: Rect) {
    let dim = Style::default().fg(Color::Rgb(70, 70, 90));
    let mut spans = Vec::new();

    if state.busy {
        let glyph = SPINNER_GLYPHS[(state.spinner_tick as usize) % SPINNER_GLYPHS.len()];
        spans.push(Span::styled(format!(" {glyph} "), Style::default().fg(Color::Cyan)));
    } else {
        spans.push(Span::styled(" ● ", Style::default().fg(Color::Rgb(0, 160, 90))));
    }

    spans.push(Span::styled(
        state.profile.clone(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled(" · ", dim));
    spans.push(Span::styled(state.base_url.clone(), Style::default().fg(Color::Rgb(140, 140, 160))));

    if state.queued > 0 {
        spans.push(Span::styled(" · ", dim));
        spans.push(Span::styled(
            format!("{} queued", state.queued),
            Style::default().fg(Color::Yellow),
        ));
    }
    if state.output.scroll > 0 {
        spans.push(Span::styled(" · ", dim));
        spans.push(Span::styled(
            format!("↑{} lines", state.output.scroll),
            Style::default().fg(Color::Yellow),
        ));
    }

    spans.push(Span::styled("   ↑↓ history  PgUp/PgDn scroll  Ctrl+C quit", dim));

    let bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Rgb(14, 14, 22)));
    f.render_widget(bar, area);
}

// ── Input box ─────────────────────────────────────────────────────────────────

fn draw_input(f: &mut Frame, state: &AppState, area: Rect) {
    let form_open = state.form.is_some();
    let (border_color, prompt_color) = if form_open {
        (Color::Rgb(40, 40, 60), Color::DarkGray)
    } else {
        (Color::Rgb(60, 60, 80), Color::Cyan)
    };

    let prompt_span = Span::styled(
        "  $ ",
        Style::default().fg(prompt_color).add_modifier(Modifier::BOLD),
    );

    let content_span = if state.input.is_empty() {
        Span::styled(
            "type a command · 'help' lists them",
            Style::default().fg(Color::Rgb(70, 70, 90)),
        )
    } else {
        Span::styled(state.input.as_str().to_string(), Style::default().fg(Color::White))
    };

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(Color::Rgb(8, 8, 14)));

    f.render_widget(Paragraph::new(Line::from(vec![prompt_span, content_span])).block(block), area);

    // The form owns the cursor while it is open
    if !form_open {
        let before = state.input.before_cursor();
        let cursor_x = area.x + PROMPT_WIDTH + before.width() as u16;
        let cursor_y = area.y + 1; // +1 for top border
        if cursor_x < area.x + area.width {
            f.set_cursor_position((cursor_x, cursor_y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_by_width() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_text("", 4), vec![""]);
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        // Wide characters count double
        assert_eq!(wrap_text("日本語", 4), vec!["日本", "語"]);
    }

    #[test]
    fn test_visible_window_follows_bottom() {
        assert_eq!(visible_window(100, 10, 0), (90, 100));
        assert_eq!(visible_window(100, 10, 5), (85, 95));
        assert_eq!(visible_window(5, 10, 0), (0, 5));
        // Scrolling past the top pins to the first page
        assert_eq!(visible_window(20, 10, 50), (0, 10));
    }

    #[test]
    fn test_render_line_with_timestamp() {
        let line = OutputLine::new(LineKind::Error, "abcdefghij");
        let rows = render_line(&line, 4 + 9 + 5, true);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans.len(), 3);
        assert_eq!(rows[0].spans[2].content, "abcde");
        assert_eq!(rows[1].spans[2].content, "fghij");
    }
}
