//! Character-by-character reveal of assistant replies

use crate::integration::DEFAULT_TYPEWRITER_INTERVAL;
use crate::messages::{Message, Role};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Reveals one message at a time, one character per interval.
///
/// Cursor positions count characters, so multi-byte text is never split.
#[derive(Debug, Clone)]
pub struct Typewriter {
    interval: Duration,
    message_id: Option<Uuid>,
    text: String,
    total_chars: usize,
    revealed: usize,
    last_step: Option<Instant>,
    revealing: bool,
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new(DEFAULT_TYPEWRITER_INTERVAL)
    }
}

impl Typewriter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            message_id: None,
            text: String::new(),
            total_chars: 0,
            revealed: 0,
            last_step: None,
            revealing: false,
        }
    }

    /// Bind to `message`.
    ///
    /// A new or changed assistant reply restarts the reveal from the first
    /// character; anything else is shown in full at once. Observing the same
    /// message again changes nothing.
    pub fn observe(&mut self, message: &Message) {
        if self.message_id == Some(message.id) && self.text == message.content {
            return;
        }

        self.message_id = Some(message.id);
        self.text = message.content.clone();
        self.total_chars = self.text.chars().count();
        self.last_step = None;

        let animate =
            message.role == Role::Assistant && !message.is_loading && !message.content.is_empty();
        if animate {
            self.revealed = 0;
            self.revealing = true;
        } else {
            self.revealed = self.total_chars;
            self.revealing = false;
        }
    }

    /// Advance by the whole intervals elapsed since the last step.
    ///
    /// Returns `true` on the tick that reveals the final character.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.revealing {
            return false;
        }

        let Some(last) = self.last_step else {
            self.last_step = Some(now);
            return false;
        };

        let elapsed = now.saturating_duration_since(last);
        let steps = (elapsed.as_nanos() / self.interval.as_nanos()) as usize;
        if steps == 0 {
            return false;
        }

        self.revealed = (self.revealed + steps).min(self.total_chars);
        self.last_step = Some(last + self.interval * steps as u32);

        if self.revealed == self.total_chars {
            self.revealing = false;
            return true;
        }
        false
    }

    /// Reveal the rest immediately; returns whether a reveal was cut short
    pub fn finish(&mut self) -> bool {
        let was_revealing = self.revealing;
        self.revealed = self.total_chars;
        self.revealing = false;
        was_revealing
    }

    pub fn visible_text(&self) -> &str {
        match self.text.char_indices().nth(self.revealed) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }

    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    pub fn message_id(&self) -> Option<Uuid> {
        self.message_id
    }
}
