use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Wrap,
    },
};

use crate::app::{App, EntryKind, PANEL_TITLE};

const PANEL_WIDTH: u16 = 44;
const PANEL_HEIGHT: u16 = 20;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    app.viewport_width = area.width;

    render_hints(app, frame, area);

    if app.panel_visible {
        let panel = panel_rect(area);
        render_panel(app, frame, panel);
        app.panel_area = Some(panel);
    } else {
        app.panel_area = None;
        app.close_area = None;
        app.send_area = None;
    }

    let toggler = toggler_rect(area);
    render_toggler(app, frame, toggler);
    app.toggler_area = Some(toggler);
}

/// The toggler button sits in the bottom-right corner, under the panel.
fn toggler_rect(area: Rect) -> Rect {
    let width = 6u16.min(area.width);
    Rect {
        x: area.width.saturating_sub(width + 1),
        y: area.height.saturating_sub(2),
        width,
        height: 1u16.min(area.height),
    }
}

/// The panel is anchored above the toggler, bottom-right.
fn panel_rect(area: Rect) -> Rect {
    let width = PANEL_WIDTH.min(area.width.saturating_sub(2));
    let height = PANEL_HEIGHT.min(area.height.saturating_sub(3));
    Rect {
        x: area.width.saturating_sub(width + 1),
        y: area.height.saturating_sub(height + 2),
        width,
        height,
    }
}

fn render_toggler(app: &App, frame: &mut Frame, area: Rect) {
    let label = if app.panel_visible { "✕" } else { "💬" };
    let toggler = Paragraph::new(label)
        .alignment(Alignment::Center)
        .style(Style::default().bg(Color::Blue).fg(Color::White).bold());
    frame.render_widget(toggler, area);
}

fn render_hints(app: &App, frame: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }
    let hints = if app.panel_visible {
        " Enter: sūtīt  Shift+Enter: jauna rinda  Esc: aizvērt "
    } else {
        " c: atvērt čatu  q: iziet "
    };
    let line = Rect {
        x: 0,
        y: area.height - 1,
        width: area.width.saturating_sub(8),
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        line,
    );
}

fn render_panel(app: &mut App, frame: &mut Frame, panel: Rect) {
    frame.render_widget(Clear, panel);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", PANEL_TITLE))
        .title_style(Style::default().fg(Color::Cyan).bold());
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    // Close control on the title border, top-right
    let close = Rect {
        x: panel.x + panel.width.saturating_sub(4),
        y: panel.y,
        width: 3u16.min(panel.width),
        height: 1,
    };
    frame.render_widget(
        Paragraph::new("✕")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red).bold()),
        close,
    );
    app.close_area = Some(close);

    if inner.height == 0 || inner.width == 0 {
        app.send_area = None;
        return;
    }

    // The send control column is 4 cells wide; the input wraps at the rest.
    let input_text_width = inner.width.saturating_sub(4);
    let input_rows = app.input_line_count(input_text_width);

    let [transcript_area, input_container] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(input_rows + 1),
    ])
    .areas(inner);

    render_transcript(app, frame, transcript_area);
    render_input(app, frame, input_container);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.transcript_height = area.height;
    app.transcript_width = area.width;

    let mut lines: Vec<Line> = Vec::new();
    for entry in &app.transcript {
        let label = match entry.kind {
            EntryKind::Outgoing => Span::styled("Jūs:", Style::default().fg(Color::Cyan).bold()),
            EntryKind::Incoming => Span::styled("Bots:", Style::default().fg(Color::Green).bold()),
        };
        lines.push(Line::from(label));
        for text_line in entry.text.lines() {
            lines.push(Line::raw(text_line.to_string()));
        }
        if entry.text.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::default());
    }

    let transcript = Paragraph::new(Text::from(lines))
        .wrap(Wrap { trim: false })
        .scroll((app.transcript_scroll, 0));
    frame.render_widget(transcript, area);

    let total_lines = app.transcript_line_count(area.width) as usize;
    if total_lines > area.height as usize {
        let mut scrollbar_state = ScrollbarState::new(total_lines.saturating_sub(area.height as usize))
            .position(app.transcript_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &mut App, frame: &mut Frame, container: Rect) {
    let divider = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = divider.inner(container);
    frame.render_widget(divider, container);

    if inner.height == 0 || inner.width == 0 {
        app.send_area = None;
        return;
    }

    let [text_area, send_area] =
        Layout::horizontal([Constraint::Min(1), Constraint::Length(4)]).areas(inner);

    let placeholder_style = Style::default().fg(Color::DarkGray);
    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled("Rakstiet ziņu...", placeholder_style))
    } else {
        Paragraph::new(app.input.as_str()).wrap(Wrap { trim: false })
    };

    let (cursor_row, cursor_col) = app.input_cursor_position(text_area.width);
    let scroll_rows = cursor_row.saturating_sub(text_area.height.saturating_sub(1));
    frame.render_widget(input.scroll((scroll_rows, 0)), text_area);
    frame.set_cursor_position(Position::new(
        text_area.x + cursor_col.min(text_area.width.saturating_sub(1)),
        text_area.y + cursor_row - scroll_rows,
    ));

    let send = Paragraph::new("➤")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD));
    let send_row = Rect {
        x: send_area.x,
        y: send_area.y + send_area.height.saturating_sub(1) / 2,
        width: send_area.width,
        height: 1u16.min(send_area.height),
    };
    frame.render_widget(send, send_row);
    app.send_area = Some(send_row);
}
