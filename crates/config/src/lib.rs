//! Configuration loading, validation, and management for TaskForge.
//!
//! Loads configuration from `~/.taskforge/config.toml` with environment
//! variable overrides. Validates all settings at startup — the core receives
//! a configuration that is already known-good.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.taskforge/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer token for the model API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Standing system instruction prepended to every model call
    /// (unless a call supplies its own).
    #[serde(default = "default_standing_instructions")]
    pub standing_instructions: String,

    /// Named model alias table
    #[serde(default)]
    pub models: ModelAliases,

    /// API endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Refinement loop settings
    #[serde(default)]
    pub execution: ExecutionConfig,
}

fn default_standing_instructions() -> String {
    "You are a diligent assistant working on a single task. \
     Be precise, avoid speculation, and keep answers focused on the task."
        .into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("standing_instructions", &self.standing_instructions)
            .field("models", &self.models)
            .field("api", &self.api)
            .field("generation", &self.generation)
            .field("execution", &self.execution)
            .finish()
    }
}

/// The five named model slots. Which alias a call uses is the orchestrator's
/// concern; the gateway only ever sees resolved ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAlias {
    Default,
    Search,
    Thinking,
    Evaluation,
    ThinkingAdvanced,
}

/// Alias → concrete model identifier table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAliases {
    #[serde(default = "default_model")]
    pub default: String,

    #[serde(default = "default_search_model")]
    pub search: String,

    #[serde(default = "default_thinking_model")]
    pub thinking: String,

    #[serde(default = "default_evaluation_model")]
    pub evaluation: String,

    #[serde(default = "default_thinking_advanced_model")]
    pub thinking_advanced: String,
}

fn default_model() -> String {
    "gpt-4.1-mini".into()
}
fn default_search_model() -> String {
    "gpt-4o-mini-search-preview".into()
}
fn default_thinking_model() -> String {
    "o4-mini".into()
}
fn default_evaluation_model() -> String {
    "gpt-4.1".into()
}
fn default_thinking_advanced_model() -> String {
    "o1".into()
}

impl Default for ModelAliases {
    fn default() -> Self {
        Self {
            default: default_model(),
            search: default_search_model(),
            thinking: default_thinking_model(),
            evaluation: default_evaluation_model(),
            thinking_advanced: default_thinking_advanced_model(),
        }
    }
}

impl ModelAliases {
    /// Resolve a named alias to its concrete model identifier.
    pub fn resolve(&self, alias: ModelAlias) -> &str {
        match alias {
            ModelAlias::Default => &self.default,
            ModelAlias::Search => &self.search,
            ModelAlias::Thinking => &self.thinking,
            ModelAlias::Evaluation => &self.evaluation,
            ModelAlias::ThinkingAdvanced => &self.thinking_advanced,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}
fn default_timeout_ms() -> u64 {
    120_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Token budget for reasoning-family models (they use a different field
    /// on the wire and need headroom for hidden reasoning tokens).
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

fn default_max_tokens() -> u32 {
    1200
}
fn default_max_completion_tokens() -> u32 {
    10_000
}
fn default_temperature() -> f32 {
    0.2
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_completion_tokens: default_max_completion_tokens(),
            default_temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Hard bound on refinement iterations per run.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Score at which the loop stops early (0..=10).
    #[serde(default = "default_target_score")]
    pub target_score: u8,
}

fn default_max_attempts() -> u32 {
    10
}
fn default_target_score() -> u8 {
    10
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            target_score: default_target_score(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.taskforge/config.toml).
    ///
    /// Also checks environment variables for the API key:
    /// - `TASKFORGE_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("TASKFORGE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".taskforge")
    }

    /// Get the default reports output directory.
    pub fn reports_dir() -> PathBuf {
        Self::config_dir().join("reports")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.default_temperature < 0.0 || self.generation.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generation.default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.execution.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "execution.max_attempts must be at least 1".into(),
            ));
        }

        if self.execution.target_score > 10 {
            return Err(ConfigError::ValidationError(
                "execution.target_score must be between 0 and 10".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            standing_instructions: default_standing_instructions(),
            models: ModelAliases::default(),
            api: ApiConfig::default(),
            generation: GenerationConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.execution.max_attempts, 10);
        assert_eq!(config.execution.target_score, 10);
        assert_eq!(config.models.thinking, "o4-mini");
    }

    #[test]
    fn alias_resolution() {
        let aliases = ModelAliases::default();
        assert_eq!(aliases.resolve(ModelAlias::Default), "gpt-4.1-mini");
        assert_eq!(aliases.resolve(ModelAlias::Search), "gpt-4o-mini-search-preview");
        assert_eq!(aliases.resolve(ModelAlias::Evaluation), "gpt-4.1");
        assert_eq!(aliases.resolve(ModelAlias::ThinkingAdvanced), "o1");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.models.default, config.models.default);
        assert_eq!(parsed.api.endpoint, config.api.endpoint);
        assert_eq!(parsed.execution.max_attempts, config.execution.max_attempts);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.generation.default_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_attempts_rejected() {
        let mut config = AppConfig::default();
        config.execution.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn target_score_above_ten_rejected() {
        let mut config = AppConfig::default();
        config.execution.target_score = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.api.endpoint, default_endpoint());
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[models]
default = "my-model"

[execution]
max_attempts = 3
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.models.default, "my-model");
        // Unset slots keep their defaults
        assert_eq!(config.models.thinking, "o4-mini");
        assert_eq!(config.execution.max_attempts, 3);
        assert_eq!(config.execution.target_score, 10);
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4.1-mini"));
        assert!(toml_str.contains("max_attempts"));
    }
}
