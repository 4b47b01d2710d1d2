//! # Time Utilities
//!
//! Wall-clock helpers. Snapshot and response timestamps are Unix milliseconds.

use chrono::{DateTime, Utc};

/// Get current UTC time.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Current Unix time in milliseconds.
///
/// Clamps to 0 for clocks set before the epoch.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Format time as RFC3339 string.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339()
}
