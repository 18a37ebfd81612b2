// akv-common - Shared constants and configuration for AtomKV
//
// This crate defines the connection parameters and defaults consumed by the
// client crate. It has no knowledge of the wire protocol.

pub mod config;
pub mod constants;
pub mod error;

// Re-export for convenience
pub use config::*;
pub use constants::*;
pub use error::*;
