use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::settings::ScheduleConfig;
use crate::credentials::RefreshCycleResult;

/// Next cycle start derived from the earliest expiry.
///
/// `min_valid_until - advance` when that lies strictly after `now`, otherwise `now + floor`.
pub fn next_wake(
    result: &RefreshCycleResult,
    advance_seconds: u64,
    floor_seconds: u64,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    expiry_wake(result, advance_seconds, now).unwrap_or_else(|| floor_wake(floor_seconds, now))
}

fn expiry_wake(
    result: &RefreshCycleResult,
    advance_seconds: u64,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let advance = TimeDelta::try_seconds(i64::try_from(advance_seconds).ok()?)?;
    result
        .min_valid_until
        .and_then(|min| min.checked_sub_signed(advance))
        .filter(|wake| *wake > now)
}

fn floor_wake(floor_seconds: u64, now: DateTime<Utc>) -> DateTime<Utc> {
    add_std(now, Duration::from_secs(floor_seconds.max(1)))
        .unwrap_or(now + TimeDelta::seconds(1))
}

fn add_std(now: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
}

/// Scheduling policy of the daemon loop.
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    pub advance_seconds: u64,
    pub floor_seconds: u64,
    pub interval_override: Option<Duration>,
}

impl From<&ScheduleConfig> for SchedulePolicy {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            advance_seconds: config.refresh_advance_seconds,
            floor_seconds: config.floor_seconds,
            interval_override: config.refresh_interval,
        }
    }
}

impl SchedulePolicy {
    /// Always strictly after `now`, never after the expiry-derived wake when one exists.
    pub fn next_wake(&self, result: &RefreshCycleResult, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = floor_wake(self.floor_seconds, now);
        let by_expiry = expiry_wake(result, self.advance_seconds, now);

        if let Some(interval) = self.interval_override.filter(|i| !i.is_zero()) {
            let by_interval = add_std(now, interval).unwrap_or(floor);
            return match by_expiry {
                Some(wake) => by_interval.min(wake),
                None => by_interval,
            };
        }

        let wake = by_expiry.unwrap_or(floor);
        // credentials without a known expiry get re-minted at least every floor interval
        if result.unknown_expiry_count > 0 {
            wake.min(floor)
        } else {
            wake
        }
    }
}
