//! Environment variable helpers
//!
//! Used by the logging layer to pick up `DELEGATES_LOG_LEVEL` and
//! `DELEGATES_LOG_FLUSH` at first use.
//!
//! ```ignore
//! use delegates_core::env::{env_get, env_get_bool};
//!
//! let depth: usize = env_get("DELEGATES_DEMO_SUBSCRIBERS", 3);
//! let flush = env_get_bool("DELEGATES_LOG_FLUSH", false);
//! ```

use std::str::FromStr;

/// Read `key` and parse it as `T`, falling back to `default` when the
/// variable is unset or does not parse.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Read `key` as a boolean flag.
///
/// "1", "true", "yes" and "on" (any case) are true, any other value is false.
/// An unset variable yields `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => parse_flag(&val),
        Err(_) => default,
    }
}

/// Read `key` and parse it as `T`; `None` if unset or unparsable.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub(crate) fn parse_flag(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
