//! Application Configuration Module
//!
//! This module centralizes the configuration for the interview service.
//! It loads settings from environment variables and provides a single,
//! shareable struct that can be passed throughout the application.

use interview_core::Timings;
use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

// --- Application Constants ---

/// Default location of the prompt templates, next to this crate's manifest.
pub const DEFAULT_PROMPTS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/prompts");
/// Default topic catalog shipped with this crate.
pub const DEFAULT_TOPICS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/topics.json");
/// Milliseconds the console voice spends on each word.
pub const DEFAULT_SPEECH_PACING_MS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DialogueProvider {
    OpenAI,
    Offline,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub provider: DialogueProvider,
    pub openai_api_key: Option<SecretString>,
    pub chat_model: String,
    pub log_level: Level,
    pub topics_path: PathBuf,
    pub prompts_dir: PathBuf,
    pub timings: Timings,
    pub speech_pacing: Duration,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Unknown dialogue provider: {0}")]
    UnknownProvider(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: String, value: String },
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `DIALOGUE_PROVIDER`: "openai" or "offline". Defaults to "openai".
    // *   `OPENAI_API_KEY`: Your secret key for the OpenAI API. Required if provider is "openai".
    // *   `CHAT_MODEL`: (Optional) The chat model that writes and grades questions. Defaults to "gpt-4o".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    // *   `TOPICS_PATH`, `PROMPTS_DIR`: (Optional) Data locations.
    // *   `SETTLE_DELAY_MS`, `RETRY_DELAY_MS`, `SPEECH_PACING_MS`: (Optional) Timing overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();

        let provider_str = env::var("DIALOGUE_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => DialogueProvider::OpenAI,
            "offline" => DialogueProvider::Offline,
            _ => return Err(ConfigError::UnknownProvider(provider_str)),
        };

        let openai_api_key = env::var("OPENAI_API_KEY").ok().map(SecretString::from);
        if provider == DialogueProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar(
                "OPENAI_API_KEY must be set for openai provider".to_string(),
            ));
        }

        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let topics_path = env::var("TOPICS_PATH")
            .unwrap_or_else(|_| DEFAULT_TOPICS_PATH.to_string())
            .into();
        let prompts_dir = env::var("PROMPTS_DIR")
            .unwrap_or_else(|_| DEFAULT_PROMPTS_DIR.to_string())
            .into();

        let defaults = Timings::default();
        let timings = Timings {
            settle_delay: millis_var("SETTLE_DELAY_MS")?.unwrap_or(defaults.settle_delay),
            retry_delay: millis_var("RETRY_DELAY_MS")?.unwrap_or(defaults.retry_delay),
        };
        let speech_pacing = millis_var("SPEECH_PACING_MS")?
            .unwrap_or(Duration::from_millis(DEFAULT_SPEECH_PACING_MS));

        Ok(Self {
            provider,
            openai_api_key,
            chat_model,
            log_level,
            topics_path,
            prompts_dir,
            timings,
            speech_pacing,
        })
    }
}

fn millis_var(name: &str) -> Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_millis(name, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_millis(name: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidNumber {
            name: name.to_string(),
            value: value.to_string(),
        })
}
