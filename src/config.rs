//! Configuration for the commentary endpoint.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable consulted for the endpoint API key.
pub const API_KEY_VAR: &str = "PARLEY_API_KEY";

/// Configuration for the remote text-generation endpoint.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct CommentaryConfig {
    /// Chat-completion URL.
    #[serde(default = "default_endpoint")]
    endpoint: String,

    /// Model name requested from the endpoint.
    #[serde(default = "default_model")]
    model: String,

    /// Maximum tokens per narration response.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Bearer token for the endpoint. Usually supplied via environment.
    #[serde(default)]
    api_key: String,

    /// Pacing delay before the AI commits to its move, in milliseconds.
    #[serde(default = "default_think_delay_ms")]
    think_delay_ms: u64,
}

fn default_endpoint() -> String {
    "https://llama70b.gaia.domains/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama70b".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_think_delay_ms() -> u64 {
    1500
}

impl CommentaryConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {e}")))?;

        info!(endpoint = %config.endpoint, model = %config.model, "Config loaded");
        Ok(config)
    }

    /// Loads the file when it exists (defaults otherwise), then lets the
    /// `PARLEY_API_KEY` environment variable override the key.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            debug!("Config file not found, using defaults");
            Self::default()
        };
        if let Ok(key) = std::env::var(API_KEY_VAR) {
            config.api_key = key;
        }
        Ok(config)
    }
}

impl Default for CommentaryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_key: String::new(),
            think_delay_ms: default_think_delay_ms(),
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where the error occurred.
    pub line: u32,
    /// Source file where the error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
