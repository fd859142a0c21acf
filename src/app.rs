use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

use crate::client::{ChatReply, ChatbotClient};
use crate::config::Config;

pub const PANEL_TITLE: &str = "Veikala asistents";
pub const GREETING: &str = "Sveiki! 👋 Kā varu palīdzēt?";
pub const THINKING: &str = "Domāju...";
pub const NO_ANSWER: &str = "Nav atbildes.";
pub const CONNECTION_ERROR: &str = "Savienojuma kļūda.";

/// The input box never grows past this many rows.
pub const MAX_INPUT_ROWS: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of the conversation as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Outgoing,
    Incoming,
}

/// A rendered transcript entry. Entries are append-only; the index
/// returned by `push_entry` stays valid and is used to overwrite the
/// thinking placeholder with the actual reply.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub text: String,
}

/// One in-flight exchange. `entry` is set once the placeholder is shown.
#[derive(Debug)]
pub struct PendingReply {
    pub id: u64,
    pub entry: Option<usize>,
}

/// Everything the request task needs, snapshotted at submission time so
/// the payload always matches the turns present when the user hit send.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: u64,
    pub history: Vec<ChatTurn>,
}

pub struct App {
    pub should_quit: bool,
    pub panel_visible: bool,

    // Input state
    pub input: String,
    pub input_cursor: usize, // char position in input

    // Conversation state
    pub history: Vec<ChatTurn>,
    pub transcript: Vec<TranscriptEntry>,
    pub pending: Vec<PendingReply>,
    next_submission: u64,

    // Transcript viewport (updated during render)
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_width: u16,
    pub viewport_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Widget areas for mouse hit-testing (updated during render)
    pub toggler_area: Option<Rect>,
    pub close_area: Option<Rect>,
    pub panel_area: Option<Rect>,
    pub send_area: Option<Rect>,

    pub client: ChatbotClient,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            should_quit: false,
            panel_visible: false,

            input: String::new(),
            input_cursor: 0,

            history: Vec::new(),
            // The greeting is part of the panel, not of the conversation.
            transcript: vec![TranscriptEntry {
                kind: EntryKind::Incoming,
                text: GREETING.to_string(),
            }],
            pending: Vec::new(),
            next_submission: 0,

            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            viewport_width: 0,

            animation_frame: 0,

            toggler_area: None,
            close_area: None,
            panel_area: None,
            send_area: None,

            client: ChatbotClient::new(config.server_url()),
        }
    }

    pub fn toggle_panel(&mut self) {
        self.panel_visible = !self.panel_visible;
    }

    pub fn close_panel(&mut self) {
        self.panel_visible = false;
    }

    pub fn push_entry(&mut self, text: impl Into<String>, kind: EntryKind) -> usize {
        self.transcript.push(TranscriptEntry {
            kind,
            text: text.into(),
        });
        self.transcript.len() - 1
    }

    /// Starts a submission cycle: trims the input and, if anything is
    /// left, clears the input box, appends the user turn to the history
    /// and the transcript, and returns the snapshot for the request
    /// task. Blank input is a no-op.
    pub fn begin_submission(&mut self) -> Option<Submission> {
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return None;
        }

        self.input.clear();
        self.input_cursor = 0;

        self.history.push(ChatTurn {
            role: ChatRole::User,
            content: message.clone(),
        });
        self.push_entry(message, EntryKind::Outgoing);
        self.scroll_transcript_to_bottom();

        let id = self.next_submission;
        self.next_submission += 1;
        self.pending.push(PendingReply { id, entry: None });

        Some(Submission {
            id,
            history: self.history.clone(),
        })
    }

    /// Appends the thinking placeholder for a pending submission.
    pub fn show_placeholder(&mut self, id: u64) {
        let Some(slot) = self.pending.iter().position(|p| p.id == id) else {
            return;
        };
        let idx = self.push_entry(THINKING, EntryKind::Incoming);
        self.pending[slot].entry = Some(idx);
        self.scroll_transcript_to_bottom();
    }

    /// Overwrites the placeholder with the outcome of the exchange. Only
    /// a real (or fallback) reply extends the history; error outcomes
    /// are confined to the transcript.
    pub fn resolve_reply(&mut self, id: u64, outcome: anyhow::Result<ChatReply>) {
        let Some(slot) = self.pending.iter().position(|p| p.id == id) else {
            return;
        };
        let pending = self.pending.remove(slot);
        let Some(idx) = pending.entry else {
            return;
        };

        let (text, extend_history) = match outcome {
            Ok(ChatReply {
                error: Some(error), ..
            }) => (format!("Kļūda: {}", error), false),
            Ok(ChatReply { reply, .. }) => {
                (reply.unwrap_or_else(|| NO_ANSWER.to_string()), true)
            }
            Err(_) => (CONNECTION_ERROR.to_string(), false),
        };

        if let Some(entry) = self.transcript.get_mut(idx) {
            entry.text = text.clone();
        }
        if extend_history {
            self.history.push(ChatTurn {
                role: ChatRole::Assistant,
                content: text,
            });
        }
    }

    /// Tick animation frame (called by Tick event). Animates the
    /// trailing dots of every visible placeholder.
    pub fn tick_animation(&mut self) {
        if self.pending.iter().all(|p| p.entry.is_none()) {
            return;
        }
        self.animation_frame = (self.animation_frame + 1) % 3;
        let text = format!("Domāju{}", ".".repeat(self.animation_frame as usize + 1));
        for p in &self.pending {
            if let Some(idx) = p.entry {
                if let Some(entry) = self.transcript.get_mut(idx) {
                    entry.text = text.clone();
                }
            }
        }
    }

    /// Total rendered transcript lines for the given wrap width: a role
    /// label line per entry, the wrapped content, and a blank separator.
    pub fn transcript_line_count(&self, width: u16) -> u16 {
        // Use actual transcript width for wrap calculation, default to 40 if not set
        let wrap_width = if width > 0 { width as usize } else { 40 };

        let mut total_lines: u16 = 0;
        for entry in &self.transcript {
            total_lines += 1; // Role line ("Jūs:" or "Bots:")
            for line in entry.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after entry
        }
        total_lines
    }

    pub fn scroll_transcript_to_bottom(&mut self) {
        let total = self.transcript_line_count(self.transcript_width);
        let visible = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };
        self.transcript_scroll = total.saturating_sub(visible);
    }

    pub fn scroll_transcript_up(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    pub fn scroll_transcript_down(&mut self, lines: u16) {
        let total = self.transcript_line_count(self.transcript_width);
        let max = total.saturating_sub(self.transcript_height.max(1));
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(max);
    }

    /// Rows the auto-growing input box needs for the given inner width,
    /// clamped to `MAX_INPUT_ROWS`. An empty input still takes one row.
    pub fn input_line_count(&self, width: u16) -> u16 {
        let wrap_width = width.max(1) as usize;
        let mut lines: u16 = 0;
        for line in self.input.split('\n') {
            let char_count = line.chars().count();
            lines += ((char_count / wrap_width) + 1) as u16;
        }
        lines.clamp(1, MAX_INPUT_ROWS)
    }

    /// Cursor position inside the wrapped input box, as (row, column).
    pub fn input_cursor_position(&self, width: u16) -> (u16, u16) {
        let wrap_width = width.max(1) as usize;
        let mut row: u16 = 0;
        let mut col: usize = 0;
        for c in self.input.chars().take(self.input_cursor) {
            if c == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
                if col == wrap_width {
                    row += 1;
                    col = 0;
                }
            }
        }
        (row, col as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn test_app() -> App {
        App::new(&Config::new())
    }

    fn submit(app: &mut App, text: &str) -> Submission {
        app.input = text.to_string();
        app.input_cursor = app.input.chars().count();
        app.begin_submission().expect("submission should start")
    }

    #[test]
    fn test_greeting_is_not_part_of_history() {
        let app = test_app();
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript[0].text, GREETING);
        assert!(app.history.is_empty());
    }

    #[test]
    fn test_blank_input_is_a_noop() {
        let mut app = test_app();
        app.input = "   \n  ".to_string();
        assert!(app.begin_submission().is_none());
        assert!(app.history.is_empty());
        assert_eq!(app.transcript.len(), 1);
        assert!(app.pending.is_empty());
    }

    #[test]
    fn test_submission_appends_user_turn_and_snapshots_it() {
        let mut app = test_app();
        let submission = submit(&mut app, "  Kur mana pasūtījuma pakas?  ");

        assert_eq!(app.history.len(), 1);
        assert_eq!(app.history[0].role, ChatRole::User);
        assert_eq!(app.history[0].content, "Kur mana pasūtījuma pakas?");
        assert_eq!(submission.history, app.history);

        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);

        let last = app.transcript.last().unwrap();
        assert_eq!(last.kind, EntryKind::Outgoing);
        assert_eq!(last.text, "Kur mana pasūtījuma pakas?");
    }

    #[test]
    fn test_placeholder_appears_after_submission() {
        let mut app = test_app();
        let submission = submit(&mut app, "Sveiki");
        app.show_placeholder(submission.id);

        let last = app.transcript.last().unwrap();
        assert_eq!(last.kind, EntryKind::Incoming);
        assert_eq!(last.text, THINKING);
        assert_eq!(app.pending.len(), 1);
    }

    #[test]
    fn test_reply_overwrites_placeholder_and_extends_history() {
        let mut app = test_app();
        let submission = submit(&mut app, "Sveiki");
        app.show_placeholder(submission.id);

        app.resolve_reply(
            submission.id,
            Ok(ChatReply {
                error: None,
                reply: Some("Hello".to_string()),
            }),
        );

        assert_eq!(app.transcript.last().unwrap().text, "Hello");
        assert_eq!(app.history.len(), 2);
        assert_eq!(app.history[1].role, ChatRole::Assistant);
        assert_eq!(app.history[1].content, "Hello");
        assert!(app.pending.is_empty());
    }

    #[test]
    fn test_endpoint_error_shows_message_and_keeps_history() {
        let mut app = test_app();
        let submission = submit(&mut app, "Sveiki");
        app.show_placeholder(submission.id);

        app.resolve_reply(
            submission.id,
            Ok(ChatReply {
                error: Some("bad input".to_string()),
                reply: None,
            }),
        );

        assert_eq!(app.transcript.last().unwrap().text, "Kļūda: bad input");
        assert_eq!(app.history.len(), 1);
    }

    #[test]
    fn test_transport_failure_shows_connection_error() {
        let mut app = test_app();
        let submission = submit(&mut app, "Sveiki");
        app.show_placeholder(submission.id);

        app.resolve_reply(submission.id, Err(anyhow!("connection refused")));

        assert_eq!(app.transcript.last().unwrap().text, CONNECTION_ERROR);
        assert_eq!(app.history.len(), 1);
    }

    #[test]
    fn test_empty_reply_falls_back_and_is_appended() {
        let mut app = test_app();
        let submission = submit(&mut app, "Sveiki");
        app.show_placeholder(submission.id);

        app.resolve_reply(
            submission.id,
            Ok(ChatReply {
                error: None,
                reply: None,
            }),
        );

        assert_eq!(app.transcript.last().unwrap().text, NO_ANSWER);
        assert_eq!(app.history.len(), 2);
        assert_eq!(app.history[1].content, NO_ANSWER);
    }

    #[test]
    fn test_error_field_wins_over_reply_field() {
        let mut app = test_app();
        let submission = submit(&mut app, "Sveiki");
        app.show_placeholder(submission.id);

        app.resolve_reply(
            submission.id,
            Ok(ChatReply {
                error: Some("busy".to_string()),
                reply: Some("ignored".to_string()),
            }),
        );

        assert_eq!(app.transcript.last().unwrap().text, "Kļūda: busy");
        assert_eq!(app.history.len(), 1);
    }

    #[test]
    fn test_overlapping_submissions_resolve_independently() {
        let mut app = test_app();
        let first = submit(&mut app, "Pirmais");
        let second = submit(&mut app, "Otrais");
        assert_eq!(second.history.len(), 2);

        app.show_placeholder(first.id);
        app.show_placeholder(second.id);

        // Replies may land in any order.
        app.resolve_reply(
            second.id,
            Ok(ChatReply {
                error: None,
                reply: Some("otrā atbilde".to_string()),
            }),
        );
        app.resolve_reply(
            first.id,
            Ok(ChatReply {
                error: None,
                reply: Some("pirmā atbilde".to_string()),
            }),
        );

        let texts: Vec<&str> = app.transcript.iter().map(|e| e.text.as_str()).collect();
        assert!(texts.contains(&"pirmā atbilde"));
        assert!(texts.contains(&"otrā atbilde"));
        assert_eq!(app.history.len(), 4);
        assert!(app.pending.is_empty());
    }

    #[test]
    fn test_resolving_unknown_submission_changes_nothing() {
        let mut app = test_app();
        app.resolve_reply(42, Err(anyhow!("late")));
        assert_eq!(app.transcript.len(), 1);
        assert!(app.history.is_empty());
    }

    #[test]
    fn test_panel_toggle_round_trip() {
        let mut app = test_app();
        assert!(!app.panel_visible);
        app.toggle_panel();
        assert!(app.panel_visible);
        app.close_panel();
        assert!(!app.panel_visible);
    }

    #[test]
    fn test_input_grows_with_content_and_resets_on_submit() {
        let mut app = test_app();
        assert_eq!(app.input_line_count(10), 1);

        app.input = "viena\ndivas\ntrīs".to_string();
        assert_eq!(app.input_line_count(10), 3);

        // Long unbroken text wraps
        app.input = "x".repeat(25);
        assert_eq!(app.input_line_count(10), 3);

        // Clamped to the maximum
        app.input = "rinda\n".repeat(10);
        assert_eq!(app.input_line_count(10), MAX_INPUT_ROWS);

        app.input_cursor = app.input.chars().count();
        app.begin_submission();
        assert_eq!(app.input_line_count(10), 1);
    }

    #[test]
    fn test_input_cursor_position_follows_wraps_and_newlines() {
        let mut app = test_app();
        app.input = "abcd\nef".to_string();

        app.input_cursor = 2;
        assert_eq!(app.input_cursor_position(10), (0, 2));

        // Just past the newline
        app.input_cursor = 5;
        assert_eq!(app.input_cursor_position(10), (1, 0));

        app.input = "x".repeat(12);
        app.input_cursor = 12;
        assert_eq!(app.input_cursor_position(5), (2, 2));
    }

    #[test]
    fn test_scroll_to_bottom_pins_last_lines() {
        let mut app = test_app();
        app.transcript_width = 20;
        app.transcript_height = 4;
        for _ in 0..5 {
            app.push_entry("rinda", EntryKind::Incoming);
        }
        app.scroll_transcript_to_bottom();
        let total = app.transcript_line_count(20);
        assert_eq!(app.transcript_scroll, total - 4);

        app.scroll_transcript_up(100);
        assert_eq!(app.transcript_scroll, 0);
        app.scroll_transcript_down(1);
        assert_eq!(app.transcript_scroll, 1);
    }

    #[test]
    fn test_tick_animation_cycles_placeholder_dots() {
        let mut app = test_app();
        let submission = submit(&mut app, "Sveiki");

        // No placeholder yet: nothing animates
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.show_placeholder(submission.id);
        app.tick_animation();
        let idx = app.pending[0].entry.unwrap();
        assert_eq!(app.transcript[idx].text, "Domāju..");
    }
}
