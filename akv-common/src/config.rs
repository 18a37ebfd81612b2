//! # Connection Configuration
//!
//! Purpose: Describe where the store lives and which client shape to build.
//!
//! ## Design Principles
//! 1. **Named Keys**: Every parameter has a stable `redis_*` key so the same
//!    model loads from the environment, a JSON document, or any lookup.
//! 2. **Defaults First**: Only the host is required; everything else falls
//!    back to the default connection-parameter set.
//! 3. **Fail Fast**: Unparseable values are reported with the offending key.
//!
//! ## Example
//!
//! ```rust
//! use akv_common::{RedisConfig, RedisMode};
//!
//! let config = RedisConfig::from_json_str(
//!     r#"{ "redis_host": "10.0.0.7", "redis_mode": "cluster" }"#,
//! )
//! .unwrap();
//! assert_eq!(config.mode, RedisMode::Cluster);
//! assert_eq!(config.port, 6379);
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{CLUSTER_MODE, DEFAULT_REDIS_DB, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT};
use crate::error::{ConfigError, ConfigResult};

pub const KEY_HOST: &str = "redis_host";
pub const KEY_PORT: &str = "redis_port";
pub const KEY_PASSWORD: &str = "redis_password";
pub const KEY_DB: &str = "redis_db";
pub const KEY_MODE: &str = "redis_mode";
pub const KEY_SKIP_FULL_COVERAGE_CHECK: &str = "redis_skip_full_coverage_check";

/// Client shape selected by `redis_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RedisMode {
    /// One store node; keys live in a numbered database.
    #[default]
    Single,
    /// Keys are distributed across cluster nodes by hash slot.
    Cluster,
}

impl RedisMode {
    /// `"cluster"` selects the clustered shape; any other value is single-node.
    pub fn parse(raw: &str) -> Self {
        if raw == CLUSTER_MODE {
            RedisMode::Cluster
        } else {
            RedisMode::Single
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RedisMode::Single => "single",
            RedisMode::Cluster => CLUSTER_MODE,
        }
    }
}

impl From<String> for RedisMode {
    fn from(raw: String) -> Self {
        RedisMode::parse(&raw)
    }
}

impl From<RedisMode> for String {
    fn from(mode: RedisMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for RedisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters for the shared client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Store host; for clusters, the seed node.
    #[serde(rename = "redis_host")]
    pub host: String,
    /// Store port; for clusters, the seed node's port.
    #[serde(rename = "redis_port", default = "default_port")]
    pub port: u16,
    /// Optional AUTH password.
    #[serde(rename = "redis_password", default)]
    pub password: Option<String>,
    /// Logical database, ignored in cluster mode.
    #[serde(rename = "redis_db", default)]
    pub db: i64,
    /// Single-node or cluster.
    #[serde(rename = "redis_mode", default)]
    pub mode: RedisMode,
    /// Skip the slot coverage check when connecting to a cluster.
    #[serde(
        rename = "redis_skip_full_coverage_check",
        default = "default_skip_full_coverage_check"
    )]
    pub skip_full_coverage_check: bool,
}

fn default_port() -> u16 {
    DEFAULT_REDIS_PORT
}

fn default_skip_full_coverage_check() -> bool {
    true
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT,
            password: None,
            db: DEFAULT_REDIS_DB,
            mode: RedisMode::Single,
            skip_full_coverage_check: default_skip_full_coverage_check(),
        }
    }
}

impl RedisConfig {
    /// Single-node parameters for `host:port`.
    pub fn single(host: impl Into<String>, port: u16) -> Self {
        RedisConfig {
            host: host.into(),
            port,
            ..RedisConfig::default()
        }
    }

    /// Cluster parameters seeded from `host:port`.
    pub fn cluster(host: impl Into<String>, port: u16) -> Self {
        RedisConfig {
            host: host.into(),
            port,
            mode: RedisMode::Cluster,
            ..RedisConfig::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    pub fn with_skip_full_coverage_check(mut self, skip: bool) -> Self {
        self.skip_full_coverage_check = skip;
        self
    }

    pub fn is_cluster(&self) -> bool {
        self.mode == RedisMode::Cluster
    }

    /// Builds a configuration from a key lookup such as `config.get(key)`.
    ///
    /// Empty values count as absent. `redis_host` is required.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let host = get(KEY_HOST).ok_or(ConfigError::Missing { key: KEY_HOST })?;
        let mut config = RedisConfig {
            host: host.trim().to_string(),
            ..RedisConfig::default()
        };
        if let Some(raw) = get(KEY_PORT) {
            config.port = parse_value(KEY_PORT, &raw)?;
        }
        config.password = get(KEY_PASSWORD);
        if let Some(raw) = get(KEY_DB) {
            config.db = parse_value(KEY_DB, &raw)?;
        }
        if let Some(raw) = get(KEY_MODE) {
            config.mode = RedisMode::parse(raw.trim());
        }
        if let Some(raw) = get(KEY_SKIP_FULL_COVERAGE_CHECK) {
            config.skip_full_coverage_check = parse_flag(KEY_SKIP_FULL_COVERAGE_CHECK, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads upper-cased keys from the process environment (`REDIS_HOST`, ...).
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key.to_ascii_uppercase()).ok())
    }

    /// Parses a JSON object keyed by the `redis_*` names.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        let config: RedisConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Checks the invariants every loader enforces.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing { key: KEY_HOST });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                key: KEY_PORT,
                value: self.port.to_string(),
            });
        }
        if self.db < 0 {
            return Err(ConfigError::Invalid {
                key: KEY_DB,
                value: self.db.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}
