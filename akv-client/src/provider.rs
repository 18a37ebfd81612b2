//! # Client Instance Provider
//!
//! Purpose: Build the shared client exactly once, on first use, and hand the
//! same instance to every caller afterwards.
//!
//! ## Design Principles
//! 1. **Once-Only Construction**: Concurrent first accesses wait on a single
//!    in-flight build; at most one client is ever constructed.
//! 2. **No Poisoned State**: A failed build caches nothing, so the next
//!    access starts over, configuration included.
//! 3. **Injectable**: A `ClientProvider` is a plain value; `instance()` is
//!    only the process-wide convenience built on top of one.
//!
//! ## States
//!
//! ```text
//! unconstructed --(first successful get_or_*)--> constructed
//!       ^                    |
//!       +---(build failed)---+
//! ```

use std::future::Future;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use akv_common::{ConfigResult, RedisConfig};

use crate::client::RedisClient;
use crate::error::{StoreError, StoreResult};

/// Lazily constructed, shared instance.
pub struct ClientProvider<T> {
    cell: OnceCell<T>,
}

impl<T> ClientProvider<T> {
    pub const fn new() -> Self {
        ClientProvider {
            cell: OnceCell::const_new(),
        }
    }

    /// The instance, if already constructed.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_constructed(&self) -> bool {
        self.cell.initialized()
    }

    /// Returns the instance, running `init` if nothing is constructed yet.
    ///
    /// Callers arriving while `init` runs wait for it. If it fails, the error
    /// goes to the caller that ran it and a waiting caller retries.
    pub async fn get_or_try_init<F, Fut, Err>(&self, init: F) -> Result<&T, Err>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Err>>,
    {
        self.cell.get_or_try_init(init).await
    }
}

impl<T> Default for ClientProvider<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientProvider<RedisClient> {
    /// Returns the shared client, loading configuration and connecting on
    /// first access.
    pub async fn get_or_connect<L>(&self, load: L) -> StoreResult<&RedisClient>
    where
        L: FnOnce() -> ConfigResult<RedisConfig>,
    {
        self.get_or_try_init(|| async move {
            let config = load()?;
            info!(mode = %config.mode, host = %config.host, port = config.port, "constructing shared client");
            let client = RedisClient::connect(&config).await.map_err(|err| {
                warn!(error = %err, "shared client construction failed");
                err
            })?;
            Ok::<_, StoreError>(client)
        })
        .await
    }
}

static INSTANCE: ClientProvider<RedisClient> = ClientProvider::new();

/// Process-wide client configured from the environment.
///
/// Reads `REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD`, `REDIS_DB`,
/// `REDIS_MODE` and `REDIS_SKIP_FULL_COVERAGE_CHECK` on first access only.
pub async fn instance() -> StoreResult<&'static RedisClient> {
    INSTANCE.get_or_connect(RedisConfig::from_env).await
}
