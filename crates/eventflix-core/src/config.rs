//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL, an optional data directory override and the
//! last email used to log in.
//!
//! Configuration is stored at `~/.config/eventflix/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "eventflix";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "https://api.eventflix.app/api";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "EVENTFLIX_API_URL";

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "EVENTFLIX_DATA_DIR";

/// Locale environment variables, most specific first
const LOCALE_ENV_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub last_email: Option<String>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            data_dir: None,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `EVENTFLIX_API_URL` / `EVENTFLIX_DATA_DIR` overrides
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(DATA_DIR_ENV).ok(),
        );
        self
    }

    fn apply_overrides(&mut self, api_url: Option<String>, data_dir: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            debug!(url = %url, "API base URL overridden from environment");
            self.api_base_url = url;
        }
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding preferences and logs
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

/// The host's locale tag from the environment, e.g. `ca_ES.UTF-8`
pub fn platform_locale() -> Option<String> {
    LOCALE_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
}
