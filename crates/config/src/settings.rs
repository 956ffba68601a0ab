//! Layered settings
//!
//! Priority: env vars > config/{env}.yaml > config/default.yaml > defaults.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Environment name (development, staging, production)
    pub environment: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub llm: LlmSettings,
    pub speech: SpeechSettings,
    pub playback: PlaybackSettings,
    pub search: SearchSettings,
    pub profile_store: ProfileStoreSettings,
    pub observability: ObservabilityConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            llm: LlmSettings::default(),
            speech: SpeechSettings::default(),
            playback: PlaybackSettings::default(),
            search: SearchSettings::default(),
            profile_store: ProfileStoreSettings::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Bearer-token authentication.
///
/// `tokens` maps a presented token to the verified user id. Token issuance
/// belongs to the external identity provider; this static table exists for
/// development and tests. Set `HEALTH_AGENT__AUTH__ENABLED=true` in
/// production.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub tokens: HashMap<String, String>,
    /// Paths that bypass authentication (health, metrics)
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tokens: HashMap::new(),
            public_paths: vec![
                "/health".to_string(),
                "/ready".to_string(),
                "/metrics".to_string(),
            ],
        }
    }
}

/// Admission control: fixed window per identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window duration in seconds
    pub window_secs: u64,
    /// Accepted requests per identity per window
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            max_requests: 60,
        }
    }
}

/// Hosted generation model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b-instruct-q4_K_M".to_string(),
            api_key: None,
            timeout_secs: 30,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Hosted speech model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    /// Transport audio format requested from the model
    pub audio_format: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8880".to_string(),
            model: "kokoro".to_string(),
            voice: "af_heart".to_string(),
            audio_format: "mp3".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Client-side playback coordination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Timeout for acquiring a fresh playback buffer, in seconds
    pub buffer_open_timeout_secs: u64,
    /// Delay before an errored session's banner auto-clears, in seconds
    pub error_clear_secs: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            buffer_open_timeout_secs: 5,
            error_clear_secs: 5,
        }
    }
}

/// External web search capability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.search.example.com/v1/search".to_string(),
            api_key: None,
            timeout_secs: 10,
            max_results: 5,
        }
    }
}

/// External user document store (read-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileStoreSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProfileStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9090".to_string(),
            api_key: None,
            timeout_secs: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Load settings from the conventional `config/` directory
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit directory.
///
/// Files are optional; built-in defaults back every section, and
/// `HEALTH_AGENT__SECTION__FIELD` environment variables override both.
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&Settings::default())?)
        .add_source(config::File::from(dir.join("default")).required(false));

    if let Some(env) = env {
        builder = builder.add_source(config::File::from(dir.join(env)).required(false));
    }

    let loaded = builder
        .add_source(
            config::Environment::with_prefix("HEALTH_AGENT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Settings>()?;

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rate_limit.window_secs, 3600);
        assert_eq!(settings.rate_limit.max_requests, 60);
        assert_eq!(settings.playback.error_clear_secs, 5);
        assert!(!settings.auth.enabled);
        assert!(settings.auth.public_paths.contains(&"/health".to_string()));
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(
            file,
            "server:\n  port: 9000\nrate_limit:\n  max_requests: 5\n"
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.rate_limit.max_requests, 5);
        // Untouched sections keep their defaults.
        assert_eq!(settings.rate_limit.window_secs, 3600);
    }

    #[test]
    fn test_env_file_layering() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.yaml"), "server:\n  port: 9000\n").unwrap();
        std::fs::write(dir.path().join("staging.yaml"), "server:\n  port: 9100\n").unwrap();

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.server.port, 9100);
    }
}
