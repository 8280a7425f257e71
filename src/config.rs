//! Formdeck Configuration Module
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (`--gateway`, `--api-url`)
//! 2. Environment variables (`FORMDECK_GATEWAY`, `FORMDECK_API_URL`)
//! 3. Config file (`--config PATH`, else `./formdeck.yaml` when present)
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FormdeckError, Result};
use crate::gateway;

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "formdeck.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormdeckConfig {
    pub gateway: GatewayConfig,
    pub timing: TimingConfig,
    pub validation: ValidationConfig,
}

/// Backend selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// `http` or `mock`
    pub kind: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub mock: MockConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: "http".to_string(),
            base_url: "http://localhost:4200".to_string(),
            timeout_ms: 10_000,
            mock: MockConfig::default(),
        }
    }
}

/// Answers of the in-memory gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MockConfig {
    pub taken: Vec<String>,
    pub result: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            taken: vec!["admin".to_string(), "root".to_string()],
            result: Some("nice job".to_string()),
        }
    }
}

/// Debounce and countdown timing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiescence window before a username check fires
    pub debounce_ms: u64,
    /// Countdown start value
    pub countdown_from: u32,
    /// Length of one countdown step
    pub tick_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            countdown_from: 5,
            tick_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Shorter usernames are never sent to the backend
    pub min_username_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_username_len: 3,
        }
    }
}

impl FormdeckConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `./formdeck.yaml` is used
    /// if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(&fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse one YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| FormdeckError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            FormdeckError::YamlParse(err) => FormdeckError::ConfigParse {
                path: path.display().to_string(),
                reason: err.to_string(),
            },
            other => other,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Merge with environment variables
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Environment merge with an injectable lookup
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(kind) = lookup("FORMDECK_GATEWAY").filter(|v| !v.is_empty()) {
            self.gateway.kind = kind;
        }
        if let Some(url) = lookup("FORMDECK_API_URL").filter(|v| !v.is_empty()) {
            self.gateway.base_url = url;
        }
        self
    }

    /// Apply CLI overrides
    pub fn with_overrides(mut self, kind: Option<String>, base_url: Option<String>) -> Self {
        if let Some(kind) = kind {
            self.gateway.kind = kind;
        }
        if let Some(url) = base_url {
            self.gateway.base_url = url;
        }
        self
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.timing.tick_ms == 0 {
            return Err(invalid("timing.tick_ms", "must be greater than 0"));
        }
        if self.timing.countdown_from == 0 {
            return Err(invalid("timing.countdown_from", "must be greater than 0"));
        }
        if self.gateway.timeout_ms == 0 {
            return Err(invalid("gateway.timeout_ms", "must be greater than 0"));
        }
        if self.gateway.kind.eq_ignore_ascii_case("http") {
            gateway::http::parse_base_url(&self.gateway.base_url)?;
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> FormdeckError {
    FormdeckError::ConfigInvalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
