use std::time::Duration;

use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::App;
use crate::tui::{AppEvent, ChatEvent};

/// Terminals at or below this width behave like the compact layout:
/// Enter inserts a newline and submission goes through the send control.
pub const COMPACT_WIDTH: u16 = 80;

/// Cosmetic pause before the thinking placeholder appears. Not a
/// timeout; the request only starts once the placeholder is due.
const PLACEHOLDER_DELAY: Duration = Duration::from_millis(600);

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse, tx),
        AppEvent::Resize(width, _) => app.viewport_width = width,
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Chat(chat) => handle_chat(app, chat),
    }
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    // Global quit
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if !app.panel_visible {
        match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('c') => app.toggle_panel(),
            _ => {}
        }
        return;
    }

    // Panel open: the input box has focus, like the widget's textarea.
    match key.code {
        KeyCode::Esc => app.close_panel(),

        KeyCode::Enter => {
            // Shift requests a newline; so does Enter on a compact
            // terminal, where the send control does the submitting.
            if key.modifiers.contains(KeyModifiers::SHIFT)
                || app.viewport_width <= COMPACT_WIDTH
            {
                insert_char(app, '\n');
            } else {
                submit(app, tx);
            }
        }

        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }

        KeyCode::Up => app.scroll_transcript_up(1),
        KeyCode::Down => app.scroll_transcript_down(1),

        KeyCode::Char(c) => insert_char(app, c),
        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
    app.input.insert(byte_pos, c);
    app.input_cursor += 1;
}

/// Starts the submission cycle and spawns its request task. The task
/// waits out the presentation delay, announces the placeholder, then
/// performs the exchange and reports the outcome.
fn submit(app: &mut App, tx: &UnboundedSender<AppEvent>) {
    let Some(submission) = app.begin_submission() else {
        return;
    };

    let client = app.client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(PLACEHOLDER_DELAY).await;
        if tx
            .send(AppEvent::Chat(ChatEvent::PlaceholderDue(submission.id)))
            .is_err()
        {
            return;
        }

        let outcome = client.send(&submission.history).await;
        let _ = tx.send(AppEvent::Chat(ChatEvent::Resolved(submission.id, outcome)));
    });
}

fn handle_chat(app: &mut App, event: ChatEvent) {
    match event {
        ChatEvent::PlaceholderDue(id) => app.show_placeholder(id),
        ChatEvent::Resolved(id, outcome) => app.resolve_reply(id, outcome),
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, tx: &UnboundedSender<AppEvent>) {
    let x = mouse.column;
    let y = mouse.row;
    let over = |area: Option<Rect>| area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if over(app.toggler_area) {
                app.toggle_panel();
            } else if over(app.close_area) {
                app.close_panel();
            } else if over(app.send_area) {
                submit(app, tx);
            }
        }
        MouseEventKind::ScrollDown => {
            if over(app.panel_area) {
                app.scroll_transcript_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if over(app.panel_area) {
                app.scroll_transcript_up(3);
            }
        }
        _ => {}
    }
}
