//! Deterministic model for tests and offline runs.

use crate::agent::TranscriptEntry;
use crate::error::{Error, Result};
use crate::llm::{CompletionParams, LanguageModel};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One recorded `complete` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Prompt as sent.
    pub prompt: String,

    /// History as sent.
    pub history: Vec<TranscriptEntry>,
}

/// Replays queued replies, then falls back to a fixed reply.
#[derive(Debug)]
pub struct ScriptedModel {
    queue: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback: String,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::replying("ok")
    }
}

impl ScriptedModel {
    /// A model that always answers `reply` once the queue is drained.
    #[must_use]
    pub fn replying(reply: &str) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, reply: &str) {
        self.lock_queue().push_back(Ok(reply.to_string()));
    }

    /// Queue a failure.
    pub fn push_failure(&self, message: &str) {
        self.lock_queue().push_back(Err(message.to_string()));
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls whose prompt contains `needle`.
    #[must_use]
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<String, String>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LanguageModel for ScriptedModel {
    fn complete(
        &self,
        prompt: &str,
        history: &[TranscriptEntry],
        _params: &CompletionParams,
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                prompt: prompt.to_string(),
                history: history.to_vec(),
            });

        match self.lock_queue().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::Collaborator(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}
