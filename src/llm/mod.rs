//! Language model clients.
//!
//! The rest of the crate only sees [`LanguageModel`]: a prompt plus prior
//! history in, generated text out.

pub mod openai;
pub mod scripted;

pub use openai::OpenAiClient;
pub use scripted::ScriptedModel;

use crate::agent::TranscriptEntry;
use crate::config::ModelConfig;
use crate::error::Result;

/// Sampling parameters sent with every completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    /// Completion token limit.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

impl From<&ModelConfig> for CompletionParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// A hosted or local language model.
///
/// Calls block for the whole round trip. Retries, if any, are the
/// implementation's business.
pub trait LanguageModel: Send + Sync {
    /// Generate a reply to `prompt` given the prior `history`.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error if the call fails or the reply is unusable.
    fn complete(
        &self,
        prompt: &str,
        history: &[TranscriptEntry],
        params: &CompletionParams,
    ) -> Result<String>;
}
