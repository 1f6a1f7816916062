//! Configuration management for RevenuePilot.
//!
//! Stores settings in ~/.config/revenuepilot/config.json. Environment
//! variables override the file: `REVPILOT_BASE_URL` and `REVPILOT_API_TOKEN`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the RevenuePilot backend
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token for the backend; env var takes precedence
    #[serde(default)]
    pub api_token: Option<String>,
    /// Steady-state poll interval override, milliseconds
    #[serde(default)]
    pub base_interval_ms: Option<u64>,
    /// Backoff ceiling override, milliseconds
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,
    /// Per-request timeout override, seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            base_interval_ms: None,
            max_backoff_ms: None,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    fn sanitize(&mut self) {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        self.base_url = if trimmed.is_empty() {
            default_base_url()
        } else {
            trimmed.to_string()
        };
        if self
            .api_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            self.api_token = None;
        }
    }

    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("revenuepilot"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load from the default path, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        if let Ok(url) = std::env::var("REVPILOT_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(token) = std::env::var("REVPILOT_API_TOKEN") {
            config.api_token = Some(token);
        }
        config.sanitize();
        config
    }

    /// Load from a specific file, falling back to defaults. A corrupt file
    /// is backed up so a later save does not clobber the evidence.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Config>(&content) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(err) => {
                preserve_corrupt_config(path, &content);
                tracing::warn!(path = %path.display(), %err, "config file corrupted; using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let mut sanitized = self.clone();
        sanitized.sanitize();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(&sanitized)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Bearer token for the backend (environment first, then config file).
    pub fn get_api_token(&self) -> Option<String> {
        std::env::var("REVPILOT_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.api_token.clone())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let backup = path.with_extension("json.corrupt");
    let _ = fs::write(backup, content);
}
