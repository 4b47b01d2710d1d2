//! # Utilities Library
//!
//! Environment-variable parsing, wall-clock helpers and the TTL-LRU cache
//! shared by the server and client crates.

pub mod cache;
pub mod envs;
pub mod time;

// Re-export commonly used functions
pub use cache::TtlLruCache;
pub use envs::{get_env, get_env_list, get_env_or, get_env_parse, get_env_parse_or};
pub use time::{format_time, now_millis, now_utc};
