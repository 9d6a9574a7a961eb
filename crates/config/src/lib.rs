//! Configuration loading and validation for hivebot.
//!
//! Loads configuration from `~/.hivebot/config.toml` (or an explicit path)
//! with environment variable overrides. Every field has a serde default so
//! a missing file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Error raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// The root configuration structure.
///
/// Maps directly to `~/.hivebot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider connection settings
    pub provider: ProviderConfig,

    /// Agent loop settings
    pub agent: AgentConfig,

    /// Tool limits and safety caps
    pub tools: ToolsConfig,

    /// Workspace directory tools are confined to
    pub workspace: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            workspace: default_workspace(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key (overridable via HIVEBOT_API_KEY)
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    pub api_base: String,

    /// Default model identifier
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://openrouter.ai/api/v1".into(),
            model: "anthropic/claude-sonnet-4".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum tool call iterations per turn in the main loop
    pub max_iterations: u32,

    /// Iteration cap for background subagents (kept lower than the main
    /// loop so a runaway background task burns less budget)
    pub subagent_max_iterations: u32,

    /// Maximum tokens per LLM response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            subagent_max_iterations: 15,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Size ceiling for file reads and writes, in bytes
    pub max_file_size: u64,

    /// Item cap for directory listings
    pub max_dir_items: usize,

    /// Wall-clock timeout for shell execution, in seconds
    pub exec_timeout_secs: u64,

    /// Brave Search API key for the web_search tool (overridable via
    /// HIVEBOT_BRAVE_API_KEY)
    pub brave_api_key: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_dir_items: 1000,
            exec_timeout_secs: 60,
            brave_api_key: None,
        }
    }
}

fn default_workspace() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => Path::new(&home).join(".hivebot").join("workspace"),
        Err(_) => PathBuf::from(".hivebot/workspace"),
    }
}

impl AppConfig {
    /// Load configuration from the given path, falling back to defaults if
    /// the file does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            toml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// The default config file location: `~/.hivebot/config.toml`.
    pub fn default_path() -> PathBuf {
        match std::env::var("HOME") {
            Ok(home) => Path::new(&home).join(".hivebot").join("config.toml"),
            Err(_) => PathBuf::from(".hivebot/config.toml"),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("HIVEBOT_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Ok(base) = std::env::var("HIVEBOT_API_BASE") {
            self.provider.api_base = base;
        }
        if let Ok(model) = std::env::var("HIVEBOT_MODEL") {
            self.provider.model = model;
        }
        if let Ok(workspace) = std::env::var("HIVEBOT_WORKSPACE") {
            self.workspace = PathBuf::from(workspace);
        }
        if let Ok(key) = std::env::var("HIVEBOT_BRAVE_API_KEY") {
            self.tools.brave_api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.agent.max_iterations, 25);
        assert!(config.agent.subagent_max_iterations < config.agent.max_iterations);
        assert_eq!(config.tools.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.tools.exec_timeout_secs, 60);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.agent.max_iterations, 25);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[agent]\nmax_iterations = 10\n\n[provider]\nmodel = \"gpt-4o\"\n"
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.provider.model, "gpt-4o");
        // Untouched sections keep defaults
        assert_eq!(config.agent.subagent_max_iterations, 15);
        assert_eq!(config.tools.max_dir_items, 1000);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not toml [[[").unwrap();

        let result = AppConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
