//! Append-only narration log for a game session.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human player.
    Human,
    /// The automated opponent.
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Human => write!(f, "Human"),
            Sender::Ai => write!(f, "AI"),
        }
    }
}

/// One narration entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    sender: Sender,
    text: String,
    seq: usize,
}

impl ChatMessage {
    /// Message author.
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Message body.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Position in the log; insertion order is display order.
    pub fn seq(&self) -> usize {
        self.seq
    }
}

/// Ordered record of everything said during a session.
///
/// Messages are only ever appended; the log is cleared as a whole when
/// the session resets.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<ChatMessage>,
}

impl ChatLog {
    /// Creates a log seeded with an AI greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        let mut log = Self {
            entries: Vec::new(),
        };
        log.append(Sender::Ai, greeting);
        log
    }

    /// Appends a message, assigning it the next sequence index.
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) {
        let text = text.into();
        debug!(%sender, text = %text, "chat message");
        let seq = self.entries.len();
        self.entries.push(ChatMessage { sender, text, seq });
    }

    /// All messages in insertion order.
    pub fn all(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// Number of messages in the log.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discards everything and starts over with a single greeting.
    pub fn reset(&mut self, greeting: impl Into<String>) {
        self.entries.clear();
        self.append(Sender::Ai, greeting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_assigns_consecutive_sequence_indices() {
        let mut log = ChatLog::new("hello");
        log.append(Sender::Human, "hi");
        log.append(Sender::Ai, "your move");

        let seqs: Vec<usize> = log.all().iter().map(ChatMessage::seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(log.all()[1].sender(), Sender::Human);
        assert_eq!(log.all()[1].text(), "hi");
    }

    #[test]
    fn reset_leaves_only_the_greeting() {
        let mut log = ChatLog::new("hello");
        log.append(Sender::Human, "hi");
        log.reset("again");

        assert_eq!(log.len(), 1);
        assert_eq!(log.all()[0].text(), "again");
        assert_eq!(log.all()[0].seq(), 0);
    }
}
