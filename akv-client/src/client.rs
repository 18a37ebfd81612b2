//! # Client Shapes
//!
//! Purpose: Compose the composite-operation facade and the pub/sub
//! convenience onto the single-node and clustered store connections.
//!
//! ## Design Principles
//! 1. **Composition over Inheritance**: One generic `Client<E>` carries every
//!    operation; the shapes differ only in the evaluator they hold.
//! 2. **Runtime Shape Selection**: `StoreConnection` delegates
//!    `ConnectionLike`, so the configured shape reuses the same facade.
//! 3. **Fail Fast**: Connection and slot-coverage problems surface during
//!    construction, not on the first command.
//!
//! ## Structure Overview
//!
//! ```text
//! Client<E: ScriptEval>
//!   ├── eval: E               (MultiplexedConnection | ClusterConnection | StoreConnection)
//!   ├── pubsub: redis::Client (node used for dedicated subscriptions)
//!   └── mode: RedisMode
//! ```

use redis::aio::{ConnectionLike, MultiplexedConnection};
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::{
    Cmd, ConnectionAddr, ConnectionInfo, ErrorKind, Pipeline, RedisConnectionInfo, RedisError,
    RedisFuture, Value,
};
use tracing::{info, warn};

use akv_common::{RedisConfig, RedisMode, CLUSTER_SLOT_COUNT};

use crate::error::{StoreError, StoreResult};

/// Store client with the composite operations and pub/sub convenience.
///
/// The facade methods live in `commands.rs` and `pubsub.rs`; both are
/// implemented once for every evaluator.
pub struct Client<E> {
    eval: E,
    pubsub: redis::Client,
    mode: RedisMode,
}

/// Client bound to one store node.
pub type SingleNodeClient = Client<MultiplexedConnection>;

/// Client routing keys across a cluster.
pub type ClusterClient = Client<ClusterConnection>;

/// Client whose shape was chosen from configuration.
pub type RedisClient = Client<StoreConnection>;

impl<E> Client<E> {
    /// Assembles a client from an evaluator and the node used for pub/sub.
    pub fn from_parts(eval: E, pubsub: redis::Client, mode: RedisMode) -> Self {
        Client { eval, pubsub, mode }
    }

    pub fn evaluator(&self) -> &E {
        &self.eval
    }

    pub fn mode(&self) -> RedisMode {
        self.mode
    }

    pub(crate) fn pubsub_source(&self) -> &redis::Client {
        &self.pubsub
    }
}

impl SingleNodeClient {
    /// Opens a multiplexed connection to `host:port`, selecting `db`.
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        config.validate()?;
        let client = redis::Client::open(node_info(config, config.db))?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(host = %config.host, port = config.port, db = config.db, "single-node client connected");
        Ok(Client::from_parts(conn, client, RedisMode::Single))
    }
}

impl ClusterClient {
    /// Connects to the cluster seeded by `host:port`.
    ///
    /// Unless `skip_full_coverage_check` is set, construction fails when the
    /// cluster does not serve every hash slot.
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        config.validate()?;
        let seed = node_info(config, 0);
        let mut builder = ClusterClientBuilder::new(vec![seed.clone()]);
        if let Some(password) = &config.password {
            builder = builder.password(password.clone());
        }
        let cluster = builder.build()?;
        let mut conn = cluster.get_async_connection().await?;
        if !config.skip_full_coverage_check {
            ensure_full_coverage(&mut conn).await?;
        }
        let pubsub = redis::Client::open(seed)?;
        info!(host = %config.host, port = config.port, "cluster client connected");
        Ok(Client::from_parts(conn, pubsub, RedisMode::Cluster))
    }
}

impl RedisClient {
    /// Builds the shape selected by `config.mode`.
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        match config.mode {
            RedisMode::Single => {
                let client = SingleNodeClient::connect(config).await?;
                Ok(client.map_eval(StoreConnection::Single))
            }
            RedisMode::Cluster => {
                let client = ClusterClient::connect(config).await?;
                Ok(client.map_eval(StoreConnection::Cluster))
            }
        }
    }
}

impl<E> Client<E> {
    fn map_eval<F>(self, wrap: impl FnOnce(E) -> F) -> Client<F> {
        Client {
            eval: wrap(self.eval),
            pubsub: self.pubsub,
            mode: self.mode,
        }
    }
}

/// Connection of either shape, chosen at runtime.
#[derive(Clone)]
pub enum StoreConnection {
    Single(MultiplexedConnection),
    Cluster(ClusterConnection),
}

impl ConnectionLike for StoreConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            StoreConnection::Single(conn) => conn.req_packed_command(cmd),
            StoreConnection::Cluster(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            StoreConnection::Single(conn) => conn.req_packed_commands(cmd, offset, count),
            StoreConnection::Cluster(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            StoreConnection::Single(conn) => conn.get_db(),
            StoreConnection::Cluster(conn) => conn.get_db(),
        }
    }
}

fn node_info(config: &RedisConfig, db: i64) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            db,
            password: config.password.clone(),
            ..Default::default()
        },
    }
}

async fn ensure_full_coverage<C>(conn: &mut C) -> StoreResult<()>
where
    C: ConnectionLike + Send,
{
    let entries: Vec<Vec<Value>> = redis::cmd("CLUSTER").arg("SLOTS").query_async(conn).await?;
    let ranges = entries
        .iter()
        .map(|entry| slot_range(entry))
        .collect::<StoreResult<Vec<_>>>()?;
    let covered = covered_slots(&ranges);
    if covered < CLUSTER_SLOT_COUNT {
        warn!(covered, total = CLUSTER_SLOT_COUNT, "cluster slot coverage incomplete");
        return Err(StoreError::IncompleteSlotCoverage {
            covered,
            total: CLUSTER_SLOT_COUNT,
        });
    }
    Ok(())
}

/// Extracts `(start, end)` from one `CLUSTER SLOTS` entry.
fn slot_range(entry: &[Value]) -> StoreResult<(u16, u16)> {
    match entry {
        [start, end, ..] => Ok((redis::from_redis_value(start)?, redis::from_redis_value(end)?)),
        _ => Err(StoreError::Response(RedisError::from((
            ErrorKind::TypeError,
            "malformed CLUSTER SLOTS entry",
        )))),
    }
}

/// Counts distinct slots served by the inclusive `ranges`.
pub(crate) fn covered_slots(ranges: &[(u16, u16)]) -> usize {
    let mut served = vec![false; CLUSTER_SLOT_COUNT];
    for &(start, end) in ranges {
        let end = (end as usize).min(CLUSTER_SLOT_COUNT - 1);
        for slot in start as usize..=end {
            served[slot] = true;
        }
    }
    served.iter().filter(|slot| **slot).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_full_single_range() {
        assert_eq!(covered_slots(&[(0, 16383)]), CLUSTER_SLOT_COUNT);
    }

    #[test]
    fn coverage_split_ranges_with_overlap() {
        let ranges = [(0, 5460), (5461, 10922), (10000, 16383)];
        assert_eq!(covered_slots(&ranges), CLUSTER_SLOT_COUNT);
    }

    #[test]
    fn coverage_detects_gap() {
        let ranges = [(0, 5460), (5462, 16383)];
        assert_eq!(covered_slots(&ranges), CLUSTER_SLOT_COUNT - 1);
    }

    #[test]
    fn coverage_ignores_inverted_and_clamps() {
        assert_eq!(covered_slots(&[(10, 5)]), 0);
        assert_eq!(covered_slots(&[(16380, u16::MAX)]), 4);
        assert_eq!(covered_slots(&[]), 0);
    }

    #[test]
    fn slot_range_reads_leading_integers() {
        let entry = vec![
            Value::Int(100),
            Value::Int(200),
            Value::Nil,
        ];
        assert_eq!(slot_range(&entry).unwrap(), (100, 200));
    }

    #[test]
    fn slot_range_rejects_short_entry() {
        let err = slot_range(&[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, StoreError::Response(_)));
    }

    #[test]
    fn node_info_carries_credentials() {
        let config = RedisConfig::single("cache", 6380)
            .with_password("pw")
            .with_db(3);
        let info = node_info(&config, config.db);
        assert!(matches!(&info.addr, ConnectionAddr::Tcp(host, 6380) if host == "cache"));
        assert_eq!(info.redis.db, 3);
        assert_eq!(info.redis.password.as_deref(), Some("pw"));
    }

    #[test]
    fn from_parts_keeps_mode() {
        let pubsub = redis::Client::open("redis://127.0.0.1/").unwrap();
        let client = Client::from_parts((), pubsub, RedisMode::Cluster);
        assert_eq!(client.mode(), RedisMode::Cluster);
    }
}
