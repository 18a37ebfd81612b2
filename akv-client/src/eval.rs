//! # Script Evaluation
//!
//! Purpose: Define the one capability the composite facade needs from a
//! connection: run a library script or a native command and hand back the
//! raw reply.
//!
//! ## Design Principles
//! 1. **Implement Once**: Every `ConnectionLike` connection (multiplexed,
//!    cluster, or the runtime-selected enum) gets the same implementation.
//! 2. **Digest First**: Scripts are invoked with `EVALSHA`; on `NOSCRIPT` the
//!    same call is re-sent as `EVAL`, which also caches the script.
//! 3. **Raw Replies**: Conversion to Rust types happens in the facade, so a
//!    test double only has to record arguments.

use async_trait::async_trait;
use redis::aio::ConnectionLike;
use redis::{Cmd, ErrorKind, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::scripts::CompositeScript;

/// Something that can evaluate library scripts and run native commands.
#[async_trait]
pub trait ScriptEval: Send + Sync {
    /// Runs `script` with a key list of exactly `[key]` and positional `args`.
    async fn eval_script(
        &self,
        script: CompositeScript,
        key: &str,
        args: Vec<Vec<u8>>,
    ) -> StoreResult<Value>;

    /// Runs a single native command.
    async fn execute(&self, cmd: Cmd) -> StoreResult<Value>;
}

/// Builds `<verb> <script-or-digest> 1 <key> <args...>`.
pub fn script_command(verb: &str, script: &str, key: &str, args: &[Vec<u8>]) -> Cmd {
    let mut cmd = redis::cmd(verb);
    cmd.arg(script).arg(1).arg(key);
    for arg in args {
        cmd.arg(arg.as_slice());
    }
    cmd
}

#[async_trait]
impl<C> ScriptEval for C
where
    C: ConnectionLike + Clone + Send + Sync,
{
    async fn eval_script(
        &self,
        script: CompositeScript,
        key: &str,
        args: Vec<Vec<u8>>,
    ) -> StoreResult<Value> {
        // Connection handles are cheap clones over one shared connection.
        let mut conn = self.clone();
        let cached = script_command("EVALSHA", script.digest(), key, &args);
        match cached.query_async::<_, Value>(&mut conn).await {
            Err(err) if err.kind() == ErrorKind::NoScriptError => {
                debug!(script = script.name(), key, "script not cached, loading with EVAL");
                let full = script_command("EVAL", script.source(), key, &args);
                full.query_async::<_, Value>(&mut conn)
                    .await
                    .map_err(StoreError::from)
            }
            reply => reply.map_err(StoreError::from),
        }
    }

    async fn execute(&self, cmd: Cmd) -> StoreResult<Value> {
        let mut conn = self.clone();
        cmd.query_async::<_, Value>(&mut conn)
            .await
            .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_command_layout() {
        let cmd = script_command("EVALSHA", "abc", "queue", &[b"10".to_vec(), b"v".to_vec()]);
        let expected = redis::cmd("EVALSHA")
            .arg("abc")
            .arg(1)
            .arg("queue")
            .arg("10")
            .arg("v")
            .get_packed_command();
        assert_eq!(cmd.get_packed_command(), expected);
    }

    #[test]
    fn script_command_keeps_binary_args() {
        let cmd = script_command("EVAL", "return 1", "k", &[vec![0, 255, 13, 10]]);
        let packed = cmd.get_packed_command();
        assert!(packed.ends_with(b"$4\r\n\x00\xff\r\n\r\n"));
    }
}
