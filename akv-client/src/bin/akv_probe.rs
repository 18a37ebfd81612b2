//! # Composite-Operation Probe
//!
//! Purpose: Exercise every composite operation once against a live store so a
//! deployment's scripting support and configuration can be checked quickly.
//!
//! Usage: `akv-probe [config.json]`. Without an argument the configuration
//! comes from the `REDIS_*` environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use akv_client::{ClientProvider, ScriptEval};
use akv_common::RedisConfig;

const PROBE_PREFIX: &str = "akv:probe";
const PROBE_EXPIRY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = env::args().nth(1);
    let provider = ClientProvider::new();
    let client = provider
        .get_or_connect(|| match &config_path {
            Some(path) => RedisConfig::from_json_file(path),
            None => RedisConfig::from_env(),
        })
        .await
        .context("connecting to the store")?;
    info!(mode = %client.mode(), "probe client ready");

    let key = |suffix: &str| format!("{PROBE_PREFIX}:{suffix}");

    let created = client
        .hset_ex(&key("hash"), "field", "value", Some(PROBE_EXPIRY))
        .await
        .context("hset_ex")?;
    info!(created, "hset_ex");

    client
        .hset_many_ex(
            &key("hash"),
            [("a", Some("1")), ("b", None), ("c", Some("3"))],
            Some(PROBE_EXPIRY),
        )
        .await
        .context("hset_many_ex")?;
    info!("hset_many_ex");

    client
        .set_ex(&key("scalar"), "value", Some(PROBE_EXPIRY))
        .await
        .context("set_ex")?;
    info!("set_ex");

    let added = client
        .sadd_ex(&key("set"), &["x", "y", "z"], Some(PROBE_EXPIRY))
        .await
        .context("sadd_ex")?;
    info!(added, "sadd_ex");

    let popped: Vec<String> = client
        .srand_pop(&key("set"), Some(2))
        .await
        .context("srand_pop")?;
    info!(?popped, "srand_pop");

    let pushed = client
        .lpush_trim(&key("queue"), &[1, 2, 3], Some(2))
        .await
        .context("lpush_trim")?;
    info!(pushed, "lpush_trim");

    let left = client
        .lpush_ex(&key("list"), &["l"], Some(PROBE_EXPIRY))
        .await
        .context("lpush_ex")?;
    let right = client
        .rpush_ex(&key("list"), &["r"], Some(PROBE_EXPIRY))
        .await
        .context("rpush_ex")?;
    info!(left, right, "lpush_ex / rpush_ex");

    let ranked = client
        .zadd_trim(&key("rank"), [("a", 1.0), ("b", 2.0), ("c", 3.0)], Some(2))
        .await
        .context("zadd_trim")?;
    info!(ranked, "zadd_trim");

    for suffix in ["hash", "scalar", "set", "queue", "list", "rank"] {
        let mut del = redis::cmd("DEL");
        del.arg(key(suffix));
        client.evaluator().execute(del).await.context("cleanup")?;
    }

    info!("all composite operations succeeded");
    Ok(())
}
