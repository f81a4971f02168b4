//! Blocking client for OpenAI-compatible chat completion APIs.

use crate::agent::{Role, TranscriptEntry};
use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionParams, LanguageModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Chat completions client.
///
/// Does not derive `Debug` so the API key never ends up in logs.
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client for `model` at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            // No overall timeout: completions block until the model answers
            .timeout(None)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Build a client from config, reading the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns a config error if the key is missing.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::new(&config.base_url, &api_key, &config.model_id)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn build_messages<'a>(prompt: &'a str, history: &'a [TranscriptEntry]) -> Vec<ChatMessage<'a>> {
    history
        .iter()
        .map(|entry| ChatMessage {
            role: match entry.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &entry.content,
        })
        .chain(std::iter::once(ChatMessage {
            role: "user",
            content: prompt,
        }))
        .collect()
}

fn parse_reply(status: reqwest::StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
            return Err(Error::Collaborator(format!("{status}: {}", err.error.message)));
        }
        return Err(Error::Collaborator(format!("{status}: {body}")));
    }

    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::Collaborator(format!("malformed completion response: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::Collaborator("completion response had no content".to_string()))
}

impl LanguageModel for OpenAiClient {
    fn complete(
        &self,
        prompt: &str,
        history: &[TranscriptEntry],
        params: &CompletionParams,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(prompt, history),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        debug!(model = %self.model, history = history.len(), "sending completion request");

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        parse_reply(status, &body)
    }
}
