//! # Composite-Operation Facade
//!
//! Purpose: Marshal named, typed arguments into the positional layout each
//! library script expects, run it, and unwrap the reply.
//!
//! ## Design Principles
//! 1. **Hard Argument Order**: Hash payloads flatten field-before-value;
//!    rank payloads flatten score-before-member. Swapping either silently
//!    corrupts data, so the order lives in one helper each.
//! 2. **Absent Means Skip**: A `None` hash value drops the field entirely.
//! 3. **Trailing Defaults**: `None` expiry or bound falls back to
//!    `DEFAULT_EXPIRY` / `DEFAULT_QUEUE_SIZE`. An expiry below one second is
//!    rejected before anything is sent.
//! 4. **Pass-Through Failures**: Store errors, including wrong-type keys,
//!    reach the caller unchanged.

use std::time::Duration;

use redis::{FromRedisValue, ToRedisArgs};

use akv_common::{DEFAULT_EXPIRY, DEFAULT_QUEUE_SIZE};

use crate::client::Client;
use crate::error::{StoreError, StoreResult};
use crate::eval::ScriptEval;
use crate::scripts::CompositeScript;

impl<E: ScriptEval> Client<E> {
    /// Sets one hash field and (re)sets the key's expiry.
    ///
    /// Returns 1 when the field was created, 0 when it was overwritten.
    pub async fn hset_ex<F, V>(
        &self,
        key: &str,
        field: F,
        value: V,
        ex: Option<Duration>,
    ) -> StoreResult<i64>
    where
        F: ToRedisArgs,
        V: ToRedisArgs,
    {
        let mut args = vec![expiry_arg(ex)?];
        args.extend(field.to_redis_args());
        args.extend(value.to_redis_args());
        self.run(CompositeScript::HashSetEx, key, args).await
    }

    /// Sets every field whose value is `Some` and (re)sets the key's expiry.
    ///
    /// Fields mapped to `None` are not written. If nothing remains, the
    /// store's argument-count error is returned as is.
    pub async fn hset_many_ex<I, F, V>(
        &self,
        key: &str,
        fields: I,
        ex: Option<Duration>,
    ) -> StoreResult<()>
    where
        I: IntoIterator<Item = (F, Option<V>)>,
        F: ToRedisArgs,
        V: ToRedisArgs,
    {
        let mut args = vec![expiry_arg(ex)?];
        args.extend(flatten_fields(fields));
        self.run(CompositeScript::HashSetManyEx, key, args).await
    }

    /// Sets a scalar value with its expiry in one `SETEX`.
    pub async fn set_ex<V>(&self, key: &str, value: V, ex: Option<Duration>) -> StoreResult<()>
    where
        V: ToRedisArgs,
    {
        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(expiry_secs(ex)?).arg(value);
        let reply = self.evaluator().execute(cmd).await?;
        unwrap_reply(&reply)
    }

    /// Adds members to a set and (re)sets its expiry.
    ///
    /// Returns the number of members that were not already present.
    pub async fn sadd_ex<V>(&self, key: &str, members: &[V], ex: Option<Duration>) -> StoreResult<i64>
    where
        V: ToRedisArgs,
    {
        let mut args = vec![expiry_arg(ex)?];
        args.extend(flatten_values(members));
        self.run(CompositeScript::SetAddEx, key, args).await
    }

    /// Pushes values onto the head of a list and keeps only the newest `bound`.
    ///
    /// Returns the length reported by `LPUSH`, i.e. before trimming.
    pub async fn lpush_trim<V>(&self, key: &str, values: &[V], bound: Option<usize>) -> StoreResult<i64>
    where
        V: ToRedisArgs,
    {
        let (start, stop) = list_trim_range(bound.unwrap_or(DEFAULT_QUEUE_SIZE));
        let mut args = vec![int_arg(start), int_arg(stop)];
        args.extend(flatten_values(values));
        self.run(CompositeScript::ListPushTrim, key, args).await
    }

    /// Pushes values onto the head of a list and (re)sets its expiry.
    pub async fn lpush_ex<V>(&self, key: &str, values: &[V], ex: Option<Duration>) -> StoreResult<i64>
    where
        V: ToRedisArgs,
    {
        let mut args = vec![expiry_arg(ex)?];
        args.extend(flatten_values(values));
        self.run(CompositeScript::ListLeftPushEx, key, args).await
    }

    /// Pushes values onto the tail of a list and (re)sets its expiry.
    pub async fn rpush_ex<V>(&self, key: &str, values: &[V], ex: Option<Duration>) -> StoreResult<i64>
    where
        V: ToRedisArgs,
    {
        let mut args = vec![expiry_arg(ex)?];
        args.extend(flatten_values(values));
        self.run(CompositeScript::ListRightPushEx, key, args).await
    }

    /// Inserts scored members and keeps only the `bound` highest-ranked.
    ///
    /// Returns the number of newly added members.
    pub async fn zadd_trim<I, M>(&self, key: &str, members: I, bound: Option<usize>) -> StoreResult<i64>
    where
        I: IntoIterator<Item = (M, f64)>,
        M: ToRedisArgs,
    {
        let (start, stop) = rank_trim_range(bound.unwrap_or(DEFAULT_QUEUE_SIZE));
        let mut args = vec![int_arg(start), int_arg(stop)];
        args.extend(flatten_scored(members));
        self.run(CompositeScript::RankAddTrim, key, args).await
    }

    /// Removes and returns up to `count` (default 1) random set members.
    ///
    /// An empty or missing set yields an empty list and is left untouched.
    pub async fn srand_pop<T>(&self, key: &str, count: Option<usize>) -> StoreResult<Vec<T>>
    where
        T: FromRedisValue,
    {
        let args = vec![count.unwrap_or(1).to_string().into_bytes()];
        self.run(CompositeScript::SetRandPop, key, args).await
    }

    async fn run<T: FromRedisValue>(
        &self,
        script: CompositeScript,
        key: &str,
        args: Vec<Vec<u8>>,
    ) -> StoreResult<T> {
        let reply = self.evaluator().eval_script(script, key, args).await?;
        unwrap_reply(&reply)
    }
}

fn unwrap_reply<T: FromRedisValue>(reply: &redis::Value) -> StoreResult<T> {
    redis::from_redis_value(reply).map_err(StoreError::from)
}

/// Whole seconds of `ex`, or of the default expiry.
///
/// Anything that truncates to zero is an error: `EXPIRE key 0` deletes the
/// key and `SETEX key 0` is refused by the store.
pub(crate) fn expiry_secs(ex: Option<Duration>) -> StoreResult<u64> {
    let ex = ex.unwrap_or(DEFAULT_EXPIRY);
    match ex.as_secs() {
        0 => Err(StoreError::InvalidExpiry(ex)),
        secs => Ok(secs),
    }
}

fn expiry_arg(ex: Option<Duration>) -> StoreResult<Vec<u8>> {
    Ok(expiry_secs(ex)?.to_string().into_bytes())
}

fn int_arg(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// `LTRIM` range keeping indices `0..bound`; a zero bound yields `stop < start`.
pub(crate) fn list_trim_range(bound: usize) -> (i64, i64) {
    (0, bound_index(bound) - 1)
}

/// `ZREMRANGEBYRANK` range removing everything below the top `bound`.
///
/// With `n` members, `-(bound + 1)` resolves to rank `n - bound - 1`, so ranks
/// `0..=n-bound-1` go and exactly `bound` remain. When `n <= bound` the range
/// is empty.
pub(crate) fn rank_trim_range(bound: usize) -> (i64, i64) {
    (0, -(bound_index(bound).saturating_add(1)))
}

/// `bound` as a store index; anything past `i64::MAX` keeps everything anyway.
fn bound_index(bound: usize) -> i64 {
    i64::try_from(bound).unwrap_or(i64::MAX)
}

pub(crate) fn flatten_values<V: ToRedisArgs>(values: &[V]) -> Vec<Vec<u8>> {
    values.iter().flat_map(|value| value.to_redis_args()).collect()
}

/// Field-before-value pairs, skipping fields whose value is absent.
pub(crate) fn flatten_fields<I, F, V>(fields: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = (F, Option<V>)>,
    F: ToRedisArgs,
    V: ToRedisArgs,
{
    let mut args = Vec::new();
    for (field, value) in fields {
        let Some(value) = value else { continue };
        args.extend(field.to_redis_args());
        args.extend(value.to_redis_args());
    }
    args
}

/// Score-before-member pairs, as `ZADD` takes them.
pub(crate) fn flatten_scored<I, M>(members: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = (M, f64)>,
    M: ToRedisArgs,
{
    let mut args = Vec::new();
    for (member, score) in members {
        args.extend(score.to_redis_args());
        args.extend(member.to_redis_args());
    }
    args
}
