use chrono::{DateTime, Utc};
use std::time::Duration;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// Unix seconds to an instant, `None` when out of range.
pub fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

/// Time left until `instant`, zero if it already passed.
pub fn duration_until(instant: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (instant - now).to_std().unwrap_or(Duration::ZERO)
}
