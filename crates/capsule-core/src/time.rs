//! Unlock date policies and timestamp formatting
//!
//! Calendar dates are interpreted in UTC: a `YYYY-MM-DD` date maps to its
//! 00:00:00 UTC instant, and "today" is the current UTC calendar day.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::constants::SAME_DAY_GRACE_SECS;
use crate::types::UnixSeconds;
use crate::ProtocolError;

/// Rule deciding the earliest acceptable unlock date and its timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockDatePolicy {
    /// Earliest date is tomorrow; timestamp is the start of the chosen day
    #[default]
    NextDay,
    /// Earliest date is today; choosing today yields now + 5 minutes
    SameDayGrace,
}

impl UnlockDatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextDay => "next_day",
            Self::SameDayGrace => "same_day_grace",
        }
    }
}

/// Current wall-clock time in Unix seconds
pub fn now_unix() -> UnixSeconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Parse a form date (`YYYY-MM-DD`)
pub fn parse_unlock_date(input: &str) -> Result<NaiveDate, ProtocolError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        ProtocolError::InvalidUnlockDate {
            message: format!("'{}' is not a YYYY-MM-DD date", input.trim()),
        }
    })
}

/// UTC calendar day containing `now`
pub fn today_utc(now: UnixSeconds) -> NaiveDate {
    i64::try_from(now)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MAX)
}

/// Earliest date the policy accepts at time `now`
pub fn min_unlock_date(policy: UnlockDatePolicy, now: UnixSeconds) -> NaiveDate {
    let today = today_utc(now);
    match policy {
        UnlockDatePolicy::NextDay => today.succ_opt().unwrap_or(today),
        UnlockDatePolicy::SameDayGrace => today,
    }
}

/// 00:00:00 UTC of `date`, in Unix seconds
pub fn start_of_day(date: NaiveDate) -> Option<UnixSeconds> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    u64::try_from(midnight.and_utc().timestamp()).ok()
}

/// Resolve a chosen calendar date into the on-chain unlock timestamp.
///
/// Dates before the policy floor are rejected.
pub fn resolve_unlock_timestamp(
    policy: UnlockDatePolicy,
    date: NaiveDate,
    now: UnixSeconds,
) -> Result<UnixSeconds, ProtocolError> {
    let floor = min_unlock_date(policy, now);
    if date < floor {
        return Err(ProtocolError::InvalidUnlockDate {
            message: format!("{} is before the earliest allowed date {}", date, floor),
        });
    }

    if policy == UnlockDatePolicy::SameDayGrace && date == today_utc(now) {
        return Ok(now + SAME_DAY_GRACE_SECS);
    }

    start_of_day(date).ok_or_else(|| ProtocolError::InvalidUnlockDate {
        message: format!("{} cannot be represented as a timestamp", date),
    })
}

/// Eligibility predicate: unlockable once wall-clock time reaches the threshold
pub fn is_unlockable(unlock_timestamp: UnixSeconds, now: UnixSeconds) -> bool {
    now >= unlock_timestamp
}

/// Long-form display, e.g. `October 18, 2026 at 03:04 PM`
pub fn format_timestamp(secs: UnixSeconds, offset: &FixedOffset) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|dt| {
            dt.with_timezone(offset)
                .format("%B %-d, %Y at %I:%M %p")
                .to_string()
        })
        .unwrap_or_else(|| secs.to_string())
}
