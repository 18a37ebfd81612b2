//! # Composite-Operation Scripts
//!
//! Purpose: Hold the fixed library of server-side Lua procedures that turn
//! multi-step updates into single atomic store operations.
//!
//! ## Design Principles
//! 1. **Server-Side Atomicity**: The store runs each script to completion
//!    before any other command, so read-then-write sequences cannot race.
//! 2. **Positional Contract**: Every script takes exactly one key; the ARGV
//!    layout documented on each variant is fixed and must match the facade.
//! 3. **Digest Caching**: SHA1 digests are computed once and reused so
//!    invocations can use `EVALSHA`.
//!
//! ## ARGV Layouts
//!
//! ```text
//! HashSetEx        ex, field, value
//! HashSetManyEx    ex, field1, value1, field2, value2, ...
//! SetAddEx         ex, member1, member2, ...
//! SetRandPop       count
//! RankAddTrim      start, stop, score1, member1, score2, member2, ...
//! ListPushTrim     start, stop, value1, value2, ...
//! ListLeftPushEx   ex, value1, value2, ...
//! ListRightPushEx  ex, value1, value2, ...
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use redis::Script;

const HASH_SET_EX: &str = r#"
local ret = redis.call("hset", KEYS[1], ARGV[2], ARGV[3])
redis.call("expire", KEYS[1], ARGV[1])
return ret
"#;

const HASH_SET_MANY_EX: &str = r#"
local unpack = unpack or table.unpack
local ret = redis.call("hmset", KEYS[1], unpack(ARGV, 2))
redis.call("expire", KEYS[1], ARGV[1])
return ret
"#;

const SET_ADD_EX: &str = r#"
local unpack = unpack or table.unpack
local ret = redis.call("sadd", KEYS[1], unpack(ARGV, 2))
redis.call("expire", KEYS[1], ARGV[1])
return ret
"#;

const SET_RAND_POP: &str = r#"
local unpack = unpack or table.unpack
local members = redis.call("srandmember", KEYS[1], ARGV[1])
if next(members) ~= nil then
    redis.call("srem", KEYS[1], unpack(members))
end
return members
"#;

const RANK_ADD_TRIM: &str = r#"
local unpack = unpack or table.unpack
local ret = redis.call("zadd", KEYS[1], unpack(ARGV, 3))
redis.call("zremrangebyrank", KEYS[1], ARGV[1], ARGV[2])
return ret
"#;

// A stop below start means a bound of zero: nothing survives.
const LIST_PUSH_TRIM: &str = r#"
local unpack = unpack or table.unpack
local start = tonumber(ARGV[1])
local stop = tonumber(ARGV[2])
local ret = redis.call("lpush", KEYS[1], unpack(ARGV, 3))
if stop < start then
    redis.call("del", KEYS[1])
elseif ret > stop + 1 then
    redis.call("ltrim", KEYS[1], start, stop)
end
return ret
"#;

const LIST_LEFT_PUSH_EX: &str = r#"
local unpack = unpack or table.unpack
local ret = redis.call("lpush", KEYS[1], unpack(ARGV, 2))
redis.call("expire", KEYS[1], ARGV[1])
return ret
"#;

const LIST_RIGHT_PUSH_EX: &str = r#"
local unpack = unpack or table.unpack
local ret = redis.call("rpush", KEYS[1], unpack(ARGV, 2))
redis.call("expire", KEYS[1], ARGV[1])
return ret
"#;

/// One procedure of the fixed script library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeScript {
    /// `HSET` one field, then `EXPIRE`.
    HashSetEx,
    /// `HMSET` many fields, then `EXPIRE`.
    HashSetManyEx,
    /// `SADD` members, then `EXPIRE`.
    SetAddEx,
    /// `SRANDMEMBER` then `SREM` exactly the selected members.
    SetRandPop,
    /// `ZADD` pairs, then `ZREMRANGEBYRANK start stop`.
    RankAddTrim,
    /// `LPUSH` values, then `LTRIM start stop` when over capacity.
    ListPushTrim,
    /// `LPUSH` values, then `EXPIRE`.
    ListLeftPushEx,
    /// `RPUSH` values, then `EXPIRE`.
    ListRightPushEx,
}

static DIGESTS: Lazy<Vec<String>> = Lazy::new(|| {
    CompositeScript::ALL
        .iter()
        .map(|script| Script::new(script.source()).get_hash().to_string())
        .collect()
});

impl CompositeScript {
    /// Every script, in declaration order.
    pub const ALL: [CompositeScript; 8] = [
        CompositeScript::HashSetEx,
        CompositeScript::HashSetManyEx,
        CompositeScript::SetAddEx,
        CompositeScript::SetRandPop,
        CompositeScript::RankAddTrim,
        CompositeScript::ListPushTrim,
        CompositeScript::ListLeftPushEx,
        CompositeScript::ListRightPushEx,
    ];

    /// Lua source sent with `EVAL`.
    pub fn source(self) -> &'static str {
        match self {
            CompositeScript::HashSetEx => HASH_SET_EX,
            CompositeScript::HashSetManyEx => HASH_SET_MANY_EX,
            CompositeScript::SetAddEx => SET_ADD_EX,
            CompositeScript::SetRandPop => SET_RAND_POP,
            CompositeScript::RankAddTrim => RANK_ADD_TRIM,
            CompositeScript::ListPushTrim => LIST_PUSH_TRIM,
            CompositeScript::ListLeftPushEx => LIST_LEFT_PUSH_EX,
            CompositeScript::ListRightPushEx => LIST_RIGHT_PUSH_EX,
        }
    }

    /// Hex SHA1 of [`source`](Self::source), as used by `EVALSHA`.
    pub fn digest(self) -> &'static str {
        &DIGESTS[self as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            CompositeScript::HashSetEx => "hsetex",
            CompositeScript::HashSetManyEx => "hmsetex",
            CompositeScript::SetAddEx => "saddex",
            CompositeScript::SetRandPop => "spoprem",
            CompositeScript::RankAddTrim => "zaddrembyrank",
            CompositeScript::ListPushTrim => "lpushtrim",
            CompositeScript::ListLeftPushEx => "lpushex",
            CompositeScript::ListRightPushEx => "rpushex",
        }
    }
}

impl fmt::Display for CompositeScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn digests_are_distinct_sha1_hex() {
        let digests: HashSet<&str> = CompositeScript::ALL.iter().map(|s| s.digest()).collect();
        assert_eq!(digests.len(), CompositeScript::ALL.len());
        for digest in digests {
            assert_eq!(digest.len(), 40);
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn digest_matches_redis_script_hash() {
        for script in CompositeScript::ALL {
            assert_eq!(script.digest(), Script::new(script.source()).get_hash());
        }
    }

    #[test]
    fn all_is_indexed_by_discriminant() {
        for (idx, script) in CompositeScript::ALL.iter().enumerate() {
            assert_eq!(*script as usize, idx);
        }
    }

    #[test]
    fn expiry_scripts_reset_ttl_from_first_arg() {
        for script in [
            CompositeScript::HashSetEx,
            CompositeScript::HashSetManyEx,
            CompositeScript::SetAddEx,
            CompositeScript::ListLeftPushEx,
            CompositeScript::ListRightPushEx,
        ] {
            assert!(
                script.source().contains(r#"redis.call("expire", KEYS[1], ARGV[1])"#),
                "{script} must expire with ARGV[1]"
            );
        }
    }

    #[test]
    fn random_pop_guards_empty_selection() {
        let source = CompositeScript::SetRandPop.source();
        let guard = source.find("next(members) ~= nil").unwrap();
        let removal = source.find(r#"redis.call("srem""#).unwrap();
        assert!(guard < removal);
    }
}
