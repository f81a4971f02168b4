//! Configuration loading and management.
//!
//! Configuration is loaded with the following precedence:
//! 1. Environment variables (`PARLEY_*`)
//! 2. Config file (`<config dir>/parley/config.toml`)
//! 3. Defaults

use crate::error::{Error, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,

    /// Language model configuration.
    pub model: ModelConfig,

    /// Conversation history window.
    pub conversation: ConversationConfig,

    /// Automatic titling.
    pub title: TitleConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one `session_<id>` folder per conversation.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./sessions"),
        }
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier sent with every request.
    pub model_id: String,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Completion token limit.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            api_key_env: "PARLEY_OPENAI_API_KEY".to_string(),
        }
    }
}

impl ModelConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns a config error if the variable is unset or empty.
    pub fn api_key(&self) -> Result<String> {
        match env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::Config(format!(
                "API key not set: export {}",
                self.api_key_env
            ))),
        }
    }
}

/// History window applied by the conversation agent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Maximum number of messages sent to the model as history.
    pub window_size: usize,

    /// Drop the oldest messages once the window overflows.
    pub truncate_on_overflow: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            truncate_on_overflow: true,
        }
    }
}

/// Automatic titling configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TitleConfig {
    /// Failed generations allowed per session before giving up.
    pub max_attempts: u32,

    /// A transcript must have strictly more entries than this to be titled.
    pub min_messages: usize,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_messages: 2,
        }
    }
}

/// Load configuration with precedence: env vars → file → defaults.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let config_path = get_config_path();
    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        config = parse_config(&contents)?;
    }

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Parse a TOML config document.
///
/// # Errors
///
/// Returns a config error if the document is not valid TOML for [`Config`].
pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
}

/// Get the path to the config file.
fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var("PARLEY_CONFIG") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map_or_else(|| PathBuf::from(".parley"), |d| d.join("parley"))
        .join("config.toml")
}

/// Apply environment variable overrides to config.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(path) = env::var("PARLEY_SESSIONS_DIR") {
        config.storage.path = PathBuf::from(path);
    }

    if let Ok(model) = env::var("PARLEY_MODEL") {
        config.model.model_id = model;
    }

    if let Ok(url) = env::var("PARLEY_BASE_URL") {
        config.model.base_url = url;
    }

    if let Ok(val) = env::var("PARLEY_WINDOW_SIZE") {
        if let Ok(size) = val.parse() {
            config.conversation.window_size = size;
        }
    }

    if let Ok(val) = env::var("PARLEY_TITLE_MAX_ATTEMPTS") {
        if let Ok(max) = val.parse() {
            config.title.max_attempts = max;
        }
    }
}
