//! Host-facing settings for running a rotator.
//!
//! These are the knobs of the process that hosts the engine, not the rotation
//! configuration itself (that one lives in the document named by
//! `config_source`). Settings are read with the `config` crate from an
//! optional TOML file, then overridden by `TRIPTYCH_*` environment variables:
//!
//! ```toml
//! config_source = "images.json"
//! default_interval_ms = 5000
//! default_fade_ms = 3000
//! slot_count = 3
//! # seed = 42
//! # reload_interval_ms = 30000
//! ```

use crate::common::SLOT_COUNT;
use crate::config::{RotationConfig, DEFAULT_FADE_MS, DEFAULT_INTERVAL_MS};
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base name of the settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "triptych";
pub const ENV_PREFIX: &str = "TRIPTYCH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostSettings {
    /// Where the rotation configuration document is read from.
    #[serde(default = "default_config_source")]
    pub config_source: PathBuf,

    /// Rotation period used when the document omits or invalidates it.
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: f64,

    /// Crossfade length used when the document omits or invalidates it.
    #[serde(default = "default_fade_ms")]
    pub default_fade_ms: f64,

    #[serde(default = "default_slot_count")]
    pub slot_count: usize,

    /// Seed for the random source. Unset means system entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// How often to re-read `config_source`. Unset disables reloading.
    #[serde(default)]
    pub reload_interval_ms: Option<u64>,
}

impl HostSettings {
    /// Reads settings from `file` (or `triptych.toml` if present) and the
    /// environment, then validates them.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };
        let settings: Self = Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if RotationConfig::new(self.default_interval_ms, 1.0).is_none() {
            return Err(invalid(
                "default_interval_ms",
                format!("must be a positive number, got {}", self.default_interval_ms),
            ));
        }
        if RotationConfig::new(1.0, self.default_fade_ms).is_none() {
            return Err(invalid(
                "default_fade_ms",
                format!("must be a positive number, got {}", self.default_fade_ms),
            ));
        }
        if self.slot_count == 0 {
            return Err(invalid("slot_count", "must be at least 1".to_string()));
        }
        if self.reload_interval_ms == Some(0) {
            return Err(invalid(
                "reload_interval_ms",
                "must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// The fallback timing for normalization.
    pub fn defaults(&self) -> RotationConfig {
        RotationConfig::new(self.default_interval_ms, self.default_fade_ms).unwrap_or_default()
    }

    pub fn reload_interval(&self) -> Option<Duration> {
        self.reload_interval_ms.map(Duration::from_millis)
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            config_source: default_config_source(),
            default_interval_ms: default_interval_ms(),
            default_fade_ms: default_fade_ms(),
            slot_count: default_slot_count(),
            seed: None,
            reload_interval_ms: None,
        }
    }
}

fn invalid(key: &'static str, reason: String) -> Error {
    Error::InvalidSetting { key, reason }
}

// --- Default value functions for serde ---

fn default_config_source() -> PathBuf {
    PathBuf::from("images.json")
}

fn default_interval_ms() -> f64 {
    DEFAULT_INTERVAL_MS
}

fn default_fade_ms() -> f64 {
    DEFAULT_FADE_MS
}

fn default_slot_count() -> usize {
    SLOT_COUNT
}
