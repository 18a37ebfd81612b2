//! # Client Errors
//!
//! Purpose: Classify store failures without altering them.
//!
//! ## Design Principles
//! 1. **Pass-Through**: Every variant keeps the original `RedisError` as its
//!    source; nothing is retried or recovered here.
//! 2. **Typed Taxonomy**: Callers match on transport, wrong-type, and script
//!    failures instead of parsing messages.

use redis::{ErrorKind, RedisError};
use thiserror::Error;

use akv_common::ConfigError;

/// Result type for the client.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network, authentication, or connection-lifecycle failure.
    #[error("connection error: {0}")]
    Connection(#[source] RedisError),

    /// The key holds a different native type than the command expects.
    #[error("wrong type: {0}")]
    WrongType(#[source] RedisError),

    /// The store rejected the call or the script faulted.
    #[error("script error: {0}")]
    Script(#[source] RedisError),

    /// The reply could not be converted into the requested Rust type.
    #[error("unexpected response: {0}")]
    Response(#[source] RedisError),

    /// Connection parameters were missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An expiry shorter than one second would delete the key just written.
    #[error("expiry must be at least one second, got {0:?}")]
    InvalidExpiry(std::time::Duration),

    /// The cluster does not serve every hash slot.
    #[error("cluster slots not fully covered: {covered} of {total}")]
    IncompleteSlotCoverage { covered: usize, total: usize },
}

impl StoreError {
    pub fn is_wrong_type(&self) -> bool {
        matches!(self, StoreError::WrongType(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }

    /// The underlying store error, when there is one.
    pub fn redis_error(&self) -> Option<&RedisError> {
        match self {
            StoreError::Connection(err)
            | StoreError::WrongType(err)
            | StoreError::Script(err)
            | StoreError::Response(err) => Some(err),
            StoreError::Config(_)
            | StoreError::InvalidExpiry(_)
            | StoreError::IncompleteSlotCoverage { .. } => None,
        }
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
            || err.kind() == ErrorKind::AuthenticationFailed
        {
            return StoreError::Connection(err);
        }
        // Script errors on older servers wrap the code inside an ERR reply.
        if err.code() == Some("WRONGTYPE") || err.to_string().contains("WRONGTYPE") {
            return StoreError::WrongType(err);
        }
        if err.kind() == ErrorKind::TypeError {
            return StoreError::Response(err);
        }
        StoreError::Script(err)
    }
}
