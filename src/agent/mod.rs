//! Conversation agent bound to one stored session.
//!
//! The agent owns the in-memory message history of its session, forwards
//! prompts to the language model with a sliding window of prior messages,
//! and persists every completed exchange through the [`SessionStore`].

pub mod message;

pub use message::{ContentBlock, Message, Role, Transcript, TranscriptEntry, flatten};

use crate::config::ConversationConfig;
use crate::error::Result;
use crate::llm::{CompletionParams, LanguageModel};
use crate::storage::SessionStore;
use std::sync::Arc;
use tracing::debug;

/// How much history accompanies each prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Maximum messages in the model context, the new prompt included.
    pub max_messages: usize,

    /// Drop the oldest messages on overflow. When off, all history is sent.
    pub truncate_on_overflow: bool,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::from(&ConversationConfig::default())
    }
}

impl From<&ConversationConfig> for WindowPolicy {
    fn from(config: &ConversationConfig) -> Self {
        Self {
            max_messages: config.window_size,
            truncate_on_overflow: config.truncate_on_overflow,
        }
    }
}

impl WindowPolicy {
    /// Index of the first history message to send.
    ///
    /// A truncated window never opens on an assistant message.
    #[must_use]
    pub fn window_start(&self, messages: &[Message]) -> usize {
        let limit = self.max_messages.saturating_sub(1);
        if !self.truncate_on_overflow || messages.len() <= limit {
            return 0;
        }

        let mut start = messages.len() - limit;
        while start < messages.len() && messages[start].role != Role::User {
            start += 1;
        }
        start
    }
}

/// A conversation agent bound to one session's storage.
pub struct ConversationAgent {
    session_id: String,
    store: Arc<dyn SessionStore>,
    model: Arc<dyn LanguageModel>,
    params: CompletionParams,
    window: WindowPolicy,
    messages: Vec<Message>,
}

impl ConversationAgent {
    /// Bind to `session_id`, loading its stored history.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored history cannot be loaded.
    pub fn bind(
        session_id: &str,
        store: Arc<dyn SessionStore>,
        model: Arc<dyn LanguageModel>,
        params: CompletionParams,
        window: WindowPolicy,
    ) -> Result<Self> {
        let messages = store.load_messages(session_id)?;
        debug!(session_id, messages = messages.len(), "agent bound");
        Ok(Self {
            session_id: session_id.to_string(),
            store,
            model,
            params,
            window,
            messages,
        })
    }

    /// The bound session.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Full stored history.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Full history flattened to `{role, content}` pairs.
    #[must_use]
    pub fn transcript(&self) -> Transcript {
        flatten(&self.messages)
    }

    /// Send `prompt` and record the exchange.
    ///
    /// Nothing is recorded if the model call fails.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error if the model fails, or a storage error if
    /// the exchange cannot be persisted.
    pub fn execute(&mut self, prompt: &str) -> Result<String> {
        let start = self.window.window_start(&self.messages);
        let history = flatten(&self.messages[start..]);

        let reply = self.model.complete(prompt, &history, &self.params)?;

        let mut updated = self.messages.clone();
        updated.push(Message::text(Role::User, prompt));
        updated.push(Message::text(Role::Assistant, &reply));
        self.store.save_messages(&self.session_id, &updated)?;
        self.messages = updated;

        debug!(
            session_id = %self.session_id,
            sent_history = history.len(),
            total = self.messages.len(),
            "exchange recorded"
        );
        Ok(reply)
    }
}
