//! Configuration settings for Coursewise.

use crate::error::{CoursewiseError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub backend: BackendSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.coursewise".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Model backend provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Anthropic Messages API.
    #[default]
    Anthropic,
    /// OpenAI chat completions.
    OpenAI,
}

impl std::str::FromStr for BackendProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(BackendProvider::Anthropic),
            "openai" => Ok(BackendProvider::OpenAI),
            _ => Err(format!("Unknown backend provider: {}", s)),
        }
    }
}

impl std::fmt::Display for BackendProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendProvider::Anthropic => write!(f, "anthropic"),
            BackendProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Which provider answers model calls.
    pub provider: BackendProvider,
    /// Model identifier sent with every request.
    pub model: String,
    /// API base URL (Anthropic provider only).
    pub base_url: String,
    /// Environment variable holding the API key (Anthropic provider only).
    pub api_key_env: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output token cap per call.
    pub max_output_tokens: u32,
    /// Maximum rounds of tool use before the forced tool-free call.
    pub max_tool_rounds: usize,
    /// Timeout for a single backend call, in seconds.
    pub timeout_secs: u64,
    /// Replaces the built-in system prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            provider: BackendProvider::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            temperature: 0.0,
            max_output_tokens: 800,
            max_tool_rounds: 2,
            timeout_secs: 60,
            system_prompt: None,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// HTTP timeout for embedding requests, in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Default number of passages returned by a search.
    pub max_results: usize,
    /// Timeout for one embed-and-query step, in seconds.
    pub query_timeout_secs: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.coursewise/index.db".to_string(),
            max_results: 5,
            query_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.backend.temperature) {
            return Err(CoursewiseError::Config(format!(
                "backend.temperature must be between 0.0 and 1.0, got {}",
                self.backend.temperature
            )));
        }
        if self.backend.max_output_tokens == 0 {
            return Err(CoursewiseError::Config(
                "backend.max_output_tokens must be greater than 0".to_string(),
            ));
        }
        if self.backend.timeout_secs == 0 || self.vector_store.query_timeout_secs == 0 {
            return Err(CoursewiseError::Config("timeouts must be greater than 0".to_string()));
        }
        if self.vector_store.max_results == 0 {
            return Err(CoursewiseError::Config(
                "vector_store.max_results must be greater than 0".to_string(),
            ));
        }
        match self.vector_store.provider.as_str() {
            "sqlite" | "memory" => Ok(()),
            other => Err(CoursewiseError::Config(format!(
                "Unknown vector store provider: {}",
                other
            ))),
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoursewiseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coursewise")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backend_contract() {
        let settings = Settings::default();
        assert_eq!(settings.backend.temperature, 0.0);
        assert_eq!(settings.backend.max_output_tokens, 800);
        assert_eq!(settings.backend.max_tool_rounds, 2);
        assert_eq!(settings.vector_store.max_results, 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [backend]
            provider = "openai"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(settings.backend.provider, BackendProvider::OpenAI);
        assert_eq!(settings.backend.model, "gpt-4o-mini");
        assert_eq!(settings.backend.max_tool_rounds, 2);
        assert_eq!(settings.vector_store.provider, "sqlite");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.vector_store.max_results = 8;
        settings.backend.system_prompt = Some("Be terse.".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.vector_store.max_results, 8);
        assert_eq!(loaded.backend.system_prompt.as_deref(), Some("Be terse."));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.backend.temperature = 1.5;
        assert!(matches!(settings.validate(), Err(CoursewiseError::Config(_))));

        let mut settings = Settings::default();
        settings.vector_store.max_results = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.vector_store.provider = "chroma".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Claude".parse::<BackendProvider>().unwrap(), BackendProvider::Anthropic);
        assert_eq!("openai".parse::<BackendProvider>().unwrap(), BackendProvider::OpenAI);
        assert!("gemini".parse::<BackendProvider>().is_err());
    }
}
