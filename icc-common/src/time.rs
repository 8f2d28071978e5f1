//! Timestamp utilities
//!
//! All timestamps in the moderation store are RFC 3339 strings in UTC with
//! millisecond precision, so they sort lexicographically.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way the store keeps it
pub fn to_store(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in store format
pub fn now_store() -> String {
    to_store(now())
}

/// Store-formatted timestamp `days` from now
pub fn days_from_now(days: i64) -> String {
    to_store(now() + Duration::days(days))
}

/// Store-formatted timestamp `hours` ago
pub fn hours_ago(hours: i64) -> String {
    to_store(now() - Duration::hours(hours))
}
