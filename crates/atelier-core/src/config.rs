//! Configuration file management for Atelier.
//!
//! Supports reading optional settings from `~/.config/atelier/config.toml`.
//! The API key is never read from the file; it comes from the process
//! environment only.

use crate::error::{AtelierError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Environment variables checked for the API key, in priority order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];
/// Environment variable overriding the configured model.
pub const MODEL_ENV_VAR: &str = "ATELIER_MODEL";

/// Root configuration structure for config.toml
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AtelierConfig {
    pub model: String,
    pub base_url: String,
    pub retry: RetryConfig,
}

/// Retry settings shared by every generation call.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 3000,
        }
    }
}

impl Default for AtelierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl AtelierConfig {
    /// Returns the path to the configuration file: ~/.config/atelier/config.toml
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AtelierError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("atelier").join("config.toml"))
    }

    /// Loads the configuration from the default path and applies
    /// environment overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::default_path()?)?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Loads the configuration from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AtelierError::config(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            AtelierError::config(format!(
                "Failed to parse configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from an environment-like lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(MODEL_ENV_VAR).filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(AtelierError::config("retry.max_attempts must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(AtelierError::config("model must not be empty"));
        }
        Ok(())
    }
}

/// Reads the API key from an environment-like lookup.
///
/// Blank values are treated as absent.
pub fn api_key_from<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
}
