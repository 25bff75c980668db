//! Configuration file support

use serde::{Deserialize, Serialize};
use sheba_chat::EngineConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for sheba
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default model to use
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// API endpoint override (e.g. a proxy)
    pub base_url: Option<String>,
    /// Text shown in place of a reply that could not be generated
    pub failure_notice: Option<String>,
    /// Custom system prompt file path
    pub system_prompt_file: Option<String>,
    /// Where thread history is stored
    pub store_path: Option<String>,
    /// API keys (alternative to environment variables)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub google: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheba")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SHEBA_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            model: Some(sheba_ai::DEFAULT_MODEL_ID.to_string()),
            temperature: Some(sheba_ai::DEFAULT_TEMPERATURE),
            ..Config::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// Google API key from the config file, if set.
    ///
    /// Environment variables are consulted later by the provider.
    pub fn google_api_key(&self) -> Option<String> {
        self.api_keys
            .google
            .clone()
            .filter(|key| !key.trim().is_empty())
    }

    /// Engine settings; the failure notice falls back to the built-in apology
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(notice) = self.failure_notice.as_ref().filter(|n| !n.trim().is_empty()) {
            config.failure_notice = notice.clone();
        }
        config
    }

    pub fn system_prompt_path(&self) -> Option<PathBuf> {
        self.system_prompt_file.as_deref().map(expand_home)
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        self.store_path.as_deref().map(expand_home)
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# sheba configuration file
# Place at ~/.config/sheba/config.toml (Linux) or set SHEBA_CONFIG_PATH

# Gemini model to use
model = "gemini-2.5-flash"

# Sampling temperature (0.0 - 2.0)
temperature = 0.7

# API endpoint override (optional)
# base_url = "https://generativelanguage.googleapis.com/v1beta"

# Text shown when a reply cannot be generated (optional)
# failure_notice = "Sorry, something went wrong. Please check your connection."

# Custom system prompt file (optional, replaces the built-in persona)
# system_prompt_file = "~/.config/sheba/system_prompt.txt"

# Thread history location (optional)
# store_path = "~/.local/share/sheba/union-sheba-history.json"

# API keys (optional - GOOGLE_API_KEY or GEMINI_API_KEY also work)
[api_keys]
# google = "..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(example_config()).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(config.temperature, Some(0.7));
        assert!(config.api_keys.google.is_none());
        assert!(config.store_path.is_none());
        assert!(config.base_url.is_none());
        assert!(config.failure_notice.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("[api_keys]\ngoogle = \"abc\"\n").unwrap();
        assert!(config.model.is_none());
        assert_eq!(config.google_api_key().as_deref(), Some("abc"));
    }

    #[test]
    fn test_engine_config_failure_notice() {
        let default = Config::default().engine_config();
        assert_eq!(
            default.failure_notice,
            sheba_chat::persona::DEFAULT_FAILURE_NOTICE
        );

        let custom = Config::parse("failure_notice = \"try later\"\n").unwrap();
        assert_eq!(custom.engine_config().failure_notice, "try later");

        let blank = Config::parse("failure_notice = \"  \"\n").unwrap();
        assert_eq!(
            blank.engine_config().failure_notice,
            sheba_chat::persona::DEFAULT_FAILURE_NOTICE
        );
    }

    #[test]
    fn test_blank_key_is_ignored() {
        let config = Config::parse("[api_keys]\ngoogle = \"  \"\n").unwrap();
        assert!(config.google_api_key().is_none());
    }

    #[test]
    fn test_unparsable_file_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [unterminated").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
        assert_eq!(Config::load_from(&dir.path().join("missing.toml")), Config::default());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/history.json"), PathBuf::from("/tmp/history.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/h.json"), home.join("h.json"));
        }
    }
}
