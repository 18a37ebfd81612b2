//! # AtomKV Client
//!
//! Purpose: Extend a Redis-protocol store client with atomic composite
//! operations (set-with-expiry, bounded push, bounded sorted-set insert,
//! random pop) and a shared, lazily constructed client instance.
//!
//! ## Design Principles
//! 1. **Server-Side Atomicity**: Each composite operation is one Lua script,
//!    so no other command interleaves between its steps.
//! 2. **Capability Composition**: A single generic `Client<E>` serves both
//!    the single-node and the clustered shape.
//! 3. **Pass-Through Errors**: Nothing is retried or recovered locally.
//! 4. **Explicit Sharing**: `ClientProvider` builds one client per provider;
//!    `instance()` is the process-wide one.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), akv_client::StoreError> {
//! let client = akv_client::instance().await?;
//! client.lpush_trim("recent", &["a", "b", "c"], Some(2)).await?;
//! client.hset_ex("user:1", "name", "ada", Some(Duration::from_secs(60))).await?;
//! let popped: Vec<String> = client.srand_pop("pool", Some(3)).await?;
//! # let _ = popped;
//! # Ok(())
//! # }
//! ```

mod client;
mod commands;
mod error;
mod eval;
mod provider;
mod pubsub;
mod scripts;

pub use client::{Client, ClusterClient, RedisClient, SingleNodeClient, StoreConnection};
pub use error::{StoreError, StoreResult};
pub use eval::{script_command, ScriptEval};
pub use provider::{instance, ClientProvider};
pub use pubsub::{Message, Subscription, SubscriptionEvent};
pub use scripts::CompositeScript;
