//! # Configuration Errors
//!
//! Errors raised while loading connection parameters. These are fatal for
//! client construction; nothing is cached when one is returned.

use thiserror::Error;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key was absent or empty.
    #[error("missing configuration key `{key}`")]
    Missing { key: &'static str },

    /// A key was present but could not be parsed.
    #[error("invalid value `{value}` for configuration key `{key}`")]
    Invalid { key: &'static str, value: String },

    /// The JSON document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
}
