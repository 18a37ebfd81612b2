//! # Defaults
//!
//! Values applied whenever a caller omits the optional trailing parameter of
//! a composite operation, plus the default connection-parameter set.

use std::time::Duration;

/// Expiry applied by the "ex" operations when the caller passes `None`.
pub const DEFAULT_EXPIRY_SECS: u64 = 24 * 60 * 60;

/// [`DEFAULT_EXPIRY_SECS`] as a `Duration`.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(DEFAULT_EXPIRY_SECS);

/// Capacity applied by the bounded operations when the caller passes `None`.
pub const DEFAULT_QUEUE_SIZE: usize = 1_000;

/// Default store host for `RedisConfig::default()`.
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";

/// Default store port.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default logical database (single-node only).
pub const DEFAULT_REDIS_DB: i64 = 0;

/// `redis_mode` value selecting the clustered client shape.
pub const CLUSTER_MODE: &str = "cluster";

/// Number of hash slots a cluster must cover.
pub const CLUSTER_SLOT_COUNT: usize = 16_384;
