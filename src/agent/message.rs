//! Conversation message types.
//!
//! Messages are stored with structured content blocks; the UI only ever sees
//! the flattened `{role, content}` form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting.
    User,

    /// The model.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// One block of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

/// A persisted message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Author.
    pub role: Role,

    /// Content blocks in order.
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A single-block text message.
    #[must_use]
    pub fn text(role: Role, text: &str) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
        }
    }

    /// Concatenated text of all blocks, newline separated.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Flatten into a transcript entry.
    #[must_use]
    pub fn to_entry(&self) -> TranscriptEntry {
        TranscriptEntry {
            role: self.role,
            content: self.plain_text(),
        }
    }
}

/// Flattened `{role, content}` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// Author.
    pub role: Role,

    /// Plain text content.
    pub content: String,
}

impl TranscriptEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }
}

/// Ordered messages of one session.
pub type Transcript = Vec<TranscriptEntry>;

/// Flatten stored messages into a transcript.
#[must_use]
pub fn flatten(messages: &[Message]) -> Transcript {
    messages.iter().map(Message::to_entry).collect()
}
