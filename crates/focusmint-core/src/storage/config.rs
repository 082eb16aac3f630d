//! TOML-based application configuration.
//!
//! Stores the session defaults, anti-cheat limits and history bound.
//! Configuration is stored at `~/.config/focusmint/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::session::SessionConfig;
use crate::validator::StepValidatorConfig;

/// Focus session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Default planned duration in minutes.
    #[serde(default = "default_duration_min")]
    pub default_duration_min: u64,
    /// Maximum tolerated out-of-focus time in seconds.
    #[serde(default = "default_integrity_threshold_secs")]
    pub integrity_threshold_secs: u64,
    #[serde(default = "default_completion_bonus")]
    pub completion_bonus: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_duration_min: default_duration_min(),
            integrity_threshold_secs: default_integrity_threshold_secs(),
            completion_bonus: default_completion_bonus(),
        }
    }
}

/// Step anti-cheat limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSettings {
    #[serde(default = "default_max_steps_per_minute")]
    pub max_steps_per_minute: u64,
    #[serde(default = "default_max_daily_steps")]
    pub max_daily_steps: u64,
    /// Validated steps required to mint one currency unit.
    #[serde(default = "default_steps_per_unit")]
    pub steps_per_unit: u64,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            max_steps_per_minute: default_max_steps_per_minute(),
            max_daily_steps: default_max_daily_steps(),
            steps_per_unit: default_steps_per_unit(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusmint/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub steps: StepSettings,
    /// Most-recent-N bound for the session history.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            steps: StepSettings::default(),
            history_cap: default_history_cap(),
        }
    }
}

fn default_duration_min() -> u64 {
    25
}
fn default_integrity_threshold_secs() -> u64 {
    30
}
fn default_completion_bonus() -> u64 {
    5
}
fn default_max_steps_per_minute() -> u64 {
    240
}
fn default_max_daily_steps() -> u64 {
    20_000
}
fn default_steps_per_unit() -> u64 {
    100
}
fn default_history_cap() -> usize {
    100
}

impl Config {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/focusmint"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, text).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            integrity_threshold_ms: self.session.integrity_threshold_secs * 1_000,
            completion_bonus: self.session.completion_bonus,
        }
    }

    pub fn step_config(&self) -> StepValidatorConfig {
        StepValidatorConfig {
            max_steps_per_minute: self.steps.max_steps_per_minute,
            window_cap_per_minute: self.steps.max_steps_per_minute,
            max_daily_steps: self.steps.max_daily_steps,
        }
    }
}
