//! Configuration types for the citewise server.
//!
//! Loaded from a TOML file; every section and field has a default, so an
//! empty file (or no file at all) yields a working local setup.

use std::path::{Path, PathBuf};

use citewise_search::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CitewiseError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CitewiseConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Completion backend.
    pub backend: BackendConfig,
    /// Search provider and page fetching.
    pub search: SearchConfig,
    /// Grounded prompt construction.
    pub prompt: PromptConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind. `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

/// Completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Path of the streaming chat endpoint.
    pub chat_path: String,
    /// Path of the model list endpoint.
    pub models_path: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Temperature for search-grounded answers.
    pub answer_temperature: f32,
    /// Temperature for pass-through chat when the request sets none.
    pub chat_temperature: f32,
    /// System prompt for pass-through chat when the request sets none.
    pub system_prompt: String,
}

/// Default system prompt for pass-through chat.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Follow the user's \
instructions carefully. Respond using markdown.";

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            chat_path: "/chat".to_owned(),
            models_path: "/models".to_owned(),
            api_key: None,
            answer_temperature: 1.0,
            chat_temperature: 1.0,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }
}

impl BackendConfig {
    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.chat_path)
    }

    /// Full URL of the model list endpoint.
    pub fn models_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.models_path)
    }
}

/// Grounded prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Upper bound on answer length, stated in the system instruction.
    pub max_sentences: u32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { max_sentences: 4 }
    }
}

impl CitewiseConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CitewiseError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CitewiseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/citewise/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("citewise").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("citewise")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/citewise-config/config.toml")
        }
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns [`CitewiseError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;

        reqwest::Url::parse(&self.backend.base_url).map_err(|e| {
            CitewiseError::Config(format!(
                "backend.base_url {:?} is not a valid URL: {e}",
                self.backend.base_url
            ))
        })?;
        for (name, path) in [
            ("backend.chat_path", &self.backend.chat_path),
            ("backend.models_path", &self.backend.models_path),
        ] {
            if !path.starts_with('/') {
                return Err(CitewiseError::Config(format!(
                    "{name} must start with '/', got {path:?}"
                )));
            }
        }
        for (name, value) in [
            ("backend.answer_temperature", self.backend.answer_temperature),
            ("backend.chat_temperature", self.backend.chat_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(CitewiseError::Config(format!(
                    "{name} must be within 0.0..=2.0, got {value}"
                )));
            }
        }
        if self.prompt.max_sentences == 0 {
            return Err(CitewiseError::Config(
                "prompt.max_sentences must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CitewiseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.chat_url(), "http://localhost:8000/chat");
        assert_eq!(config.prompt.max_sentences, 4);
        assert_eq!(config.search.max_results, 5);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: CitewiseConfig = toml::from_str("").expect("parse");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.backend.models_path, "/models");
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: CitewiseConfig = toml::from_str(
            r#"
            [backend]
            base_url = "http://gpu-box:9000/"

            [search]
            max_results = 3
            "#,
        )
        .expect("parse");
        assert_eq!(config.backend.chat_url(), "http://gpu-box:9000/chat");
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.search.text_cap, 2_000);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CitewiseConfig::default();
        config.server.port = 8123;
        config.backend.api_key = Some("sk-local".into());
        config.save_to_file(&path).expect("save");

        let loaded = CitewiseConfig::from_file(&path).expect("load");
        assert_eq!(loaded.server.port, 8123);
        assert_eq!(loaded.backend.api_key.as_deref(), Some("sk-local"));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = CitewiseConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(CitewiseError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");
        let result = CitewiseConfig::from_file(&path);
        assert!(matches!(result, Err(CitewiseError::Config(_))));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = CitewiseConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("citewise"));
    }

    #[test]
    fn validate_rejects_bad_backend_url() {
        let mut config = CitewiseConfig::default();
        config.backend.base_url = "not a url".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend.base_url"));
    }

    #[test]
    fn validate_rejects_relative_paths() {
        let mut config = CitewiseConfig::default();
        config.backend.chat_path = "chat".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let mut config = CitewiseConfig::default();
        config.backend.answer_temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_too_many_results() {
        let mut config = CitewiseConfig::default();
        config.search.max_results = 11;
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), crate::error::error_codes::CONFIG_INVALID);
    }

    #[test]
    fn validate_rejects_zero_sentences() {
        let mut config = CitewiseConfig::default();
        config.prompt.max_sentences = 0;
        assert!(config.validate().is_err());
    }
}
