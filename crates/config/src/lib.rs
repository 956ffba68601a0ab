//! Configuration management for the health assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default.yaml`, then `config/{env}.yaml`)
//! - Environment variables (`HEALTH_AGENT__` prefix, `__` separator)
//! - Built-in defaults for every section

pub mod settings;

pub use settings::{
    load_settings, load_settings_from, AuthConfig, LlmSettings, ObservabilityConfig,
    PlaybackSettings, ProfileStoreSettings, RateLimitConfig, SearchSettings, ServerConfig,
    Settings, SpeechSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
