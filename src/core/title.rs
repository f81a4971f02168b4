//! Automatic session titling.

use crate::agent::TranscriptEntry;
use crate::config::TitleConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionParams, LanguageModel};
use crate::storage::SessionStore;
use std::sync::Arc;
use tracing::info;

const TITLE_PROMPT: &str = "Generate a short title, in less than 5 words, for the conversation given below.
Just provide the title, do not put any additional context or explanation.
Do not put any quotation marks around the title text.

Conversation:
";

/// Build the summarization prompt for a transcript.
#[must_use]
pub fn title_prompt(transcript: &[TranscriptEntry]) -> String {
    let all_messages = transcript
        .iter()
        .map(|entry| entry.content.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{TITLE_PROMPT}{all_messages}")
}

/// When a session qualifies for titling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitlePolicy {
    /// Failed generations allowed before giving up on a session.
    pub max_attempts: u32,

    /// Transcript must be strictly longer than this.
    pub min_messages: usize,
}

impl Default for TitlePolicy {
    fn default() -> Self {
        Self::from(&TitleConfig::default())
    }
}

impl From<&TitleConfig> for TitlePolicy {
    fn from(config: &TitleConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            min_messages: config.min_messages,
        }
    }
}

/// What a titling check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    /// A title was generated and persisted.
    Generated(String),

    /// The session already has a real title.
    AlreadyTitled,

    /// Transcript too short to summarize.
    NotEnoughMessages,

    /// Earlier failures used up the retry budget.
    AttemptsExhausted,

    /// Generation failed this time; counted against the budget.
    Failed,
}

/// Summarizes transcripts into short titles.
pub struct TitleGenerator {
    model: Arc<dyn LanguageModel>,
    params: CompletionParams,
    policy: TitlePolicy,
}

impl TitleGenerator {
    /// Create a generator over a stateless model.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, params: CompletionParams, policy: TitlePolicy) -> Self {
        Self {
            model,
            params,
            policy,
        }
    }

    /// Trigger policy.
    #[must_use]
    pub fn policy(&self) -> TitlePolicy {
        self.policy
    }

    /// Summarize `transcript` and write the title for `session_id`.
    ///
    /// The model is called with no history. Existence of a previous title is
    /// the caller's check; the write itself is create-if-absent, so a title
    /// written concurrently wins and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error if the model fails or answers with a blank
    /// title, or a storage error if the title cannot be written.
    pub fn generate_and_persist_title(
        &self,
        transcript: &[TranscriptEntry],
        store: &dyn SessionStore,
        session_id: &str,
    ) -> Result<Option<String>> {
        let prompt = title_prompt(transcript);
        let title = self.model.complete(&prompt, &[], &self.params)?;

        if title.trim().is_empty() {
            return Err(Error::Collaborator("model returned a blank title".to_string()));
        }

        if store.create_title(session_id, &title)? {
            info!(session_id, title = title.trim(), "session titled");
            Ok(Some(title))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;
    use crate::llm::ScriptedModel;
    use crate::storage::MemoryBackend;

    fn transcript() -> Vec<TranscriptEntry> {
        vec![
            TranscriptEntry::new(Role::User, "how do lifetimes work"),
            TranscriptEntry::new(Role::Assistant, "they bound references"),
            TranscriptEntry::new(Role::User, "thanks"),
        ]
    }

    fn generator(model: &Arc<ScriptedModel>) -> TitleGenerator {
        TitleGenerator::new(
            Arc::clone(model) as Arc<dyn LanguageModel>,
            CompletionParams::default(),
            TitlePolicy::default(),
        )
    }

    #[test]
    fn prompt_joins_contents_with_commas() {
        let prompt = title_prompt(&transcript());
        assert!(prompt.starts_with("Generate a short title, in less than 5 words"));
        assert!(prompt.ends_with(
            "Conversation:\nhow do lifetimes work, they bound references, thanks"
        ));
    }

    #[test]
    fn generates_with_empty_history_and_persists() {
        let store = MemoryBackend::new();
        store.create_session("s").unwrap();
        let model = Arc::new(ScriptedModel::replying("Rust Lifetimes Explained"));

        let title = generator(&model)
            .generate_and_persist_title(&transcript(), &store, "s")
            .unwrap();

        assert_eq!(title.as_deref(), Some("Rust Lifetimes Explained"));
        assert!(model.calls()[0].history.is_empty());
        assert_eq!(
            store.list_sessions().unwrap().records()[0].title,
            "Rust Lifetimes Explained"
        );
    }

    #[test]
    fn existing_title_wins() {
        let store = MemoryBackend::new();
        store.create_session("s").unwrap();
        store.create_title("s", "Written elsewhere").unwrap();
        let model = Arc::new(ScriptedModel::replying("New title"));

        let title = generator(&model)
            .generate_and_persist_title(&transcript(), &store, "s")
            .unwrap();

        assert!(title.is_none());
        assert_eq!(
            store.list_sessions().unwrap().records()[0].title,
            "Written elsewhere"
        );
    }

    #[test]
    fn blank_reply_is_collaborator_error() {
        let store = MemoryBackend::new();
        store.create_session("s").unwrap();
        let model = Arc::new(ScriptedModel::replying("  \n"));

        let err = generator(&model)
            .generate_and_persist_title(&transcript(), &store, "s")
            .unwrap_err();

        assert!(matches!(err, Error::Collaborator(_)));
        assert!(!store.has_title("s").unwrap());
    }

    #[test]
    fn model_failure_propagates() {
        let store = MemoryBackend::new();
        store.create_session("s").unwrap();
        let model = Arc::new(ScriptedModel::default());
        model.push_failure("timeout");

        assert!(
            generator(&model)
                .generate_and_persist_title(&transcript(), &store, "s")
                .is_err()
        );
    }
}
