//! Configuration loading.
//!
//! The configuration is a YAML file read once per invocation. Its location is
//! `$ASSISTANT_CONFIG` when set, otherwise `~/.assistant.yaml`. Every key is
//! optional; a missing file means built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::prompt::DEFAULT_SYSTEM_MESSAGE;
use crate::error::{AssistantError, Result};

pub const CONFIG_ENV: &str = "ASSISTANT_CONFIG";

/// Sampling and tool-use options sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub with_tools: bool,
    /// Upper bound on tool-call rounds within one invocation.
    pub max_tool_rounds: usize,
    /// Ask before executing each tool call.
    pub confirm_tools: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            with_tools: true,
            max_tool_rounds: 5,
            confirm_tools: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Lines of pane text to capture; 0 captures everything available.
    pub size: usize,
    pub all_panes: bool,
}

/// Endpoint and credentials of one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationOptions,
    pub default_model: String,
    pub default_system_message: String,
    pub contexts: Vec<String>,
    pub history_context_options: HistoryOptions,
    pub system_messages: BTreeMap<String, String>,
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let system_messages =
            BTreeMap::from([("default".to_string(), DEFAULT_SYSTEM_MESSAGE.to_string())]);
        let providers = BTreeMap::from([
            (
                "openai".to_string(),
                ProviderConfig::new("https://api.openai.com/v1", ""),
            ),
            (
                "mistral".to_string(),
                ProviderConfig::new("https://api.mistral.ai/v1", ""),
            ),
            (
                "ollama".to_string(),
                ProviderConfig::new("http://localhost:11434/v1", ""),
            ),
        ]);

        Self {
            generation: GenerationOptions::default(),
            default_model: "openai/gpt-4o".to_string(),
            default_system_message: "default".to_string(),
            contexts: vec!["shell".into(), "pwd".into(), "history".into()],
            history_context_options: HistoryOptions::default(),
            system_messages,
            providers,
        }
    }
}

impl Config {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| AssistantError::Config(e.to_string()))
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|e| {
            AssistantError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&raw)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `$ASSISTANT_CONFIG`, falling back to `~/.assistant.yaml`.
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path())
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}

pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => home_dir().join(".assistant.yaml"),
    }
}
