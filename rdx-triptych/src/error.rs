//! Error types for the parts of Triptych that can actually fail.
//!
//! The rotation core itself never fails: degraded input resolves to an idle
//! engine or an unchanged image. Errors only surface from host settings and
//! from reading a configuration source.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for fallible Triptych operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The settings file or environment could not be read or deserialized.
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// A setting was read but its value is unusable.
    #[error("Invalid setting `{key}`: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    /// The configuration source could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration source is not valid JSON.
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
