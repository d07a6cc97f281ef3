//! Unit-aware durations for estimates and spent time.
//!
//! A [`Duration`] is a magnitude paired with a [`TimeUnit`]. Converting
//! between units that span a working day or longer depends on a
//! [`TimePolicy`], which says how many hours make up a day, how many days a
//! week and how many days a month.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3600.0;
const MICROS_PER_CALENDAR_DAY: f64 = 86_400_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl TimeUnit {
    /// Number of seconds one unit spans under `policy`
    pub fn seconds(&self, policy: &TimePolicy) -> f64 {
        match self {
            TimeUnit::Second => 1.0,
            TimeUnit::Minute => SECONDS_PER_MINUTE,
            TimeUnit::Hour => SECONDS_PER_HOUR,
            TimeUnit::Day => policy.hours_per_day * SECONDS_PER_HOUR,
            TimeUnit::Week => policy.days_per_week * policy.hours_per_day * SECONDS_PER_HOUR,
            TimeUnit::Month => policy.days_per_month * policy.hours_per_day * SECONDS_PER_HOUR,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Second => write!(f, "second"),
            TimeUnit::Minute => write!(f, "minute"),
            TimeUnit::Hour => write!(f, "hour"),
            TimeUnit::Day => write!(f, "day"),
            TimeUnit::Week => write!(f, "week"),
            TimeUnit::Month => write!(f, "month"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().trim_end_matches('s') {
            "second" | "sec" => Ok(TimeUnit::Second),
            "minute" | "min" => Ok(TimeUnit::Minute),
            "hour" | "h" => Ok(TimeUnit::Hour),
            "day" | "d" => Ok(TimeUnit::Day),
            "week" | "w" => Ok(TimeUnit::Week),
            "month" => Ok(TimeUnit::Month),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid time unit '{}'. Expected: second, minute, hour, day, week, month",
                s
            ))),
        }
    }
}

/// Calendar definition used when converting between hours and days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePolicy {
    pub hours_per_day: f64,
    pub days_per_week: f64,
    pub days_per_month: f64,
}

impl TimePolicy {
    /// Round-the-clock calendar: a day is 24 hours.
    pub const ALL_HOURS: TimePolicy = TimePolicy {
        hours_per_day: 24.0,
        days_per_week: 7.0,
        days_per_month: 30.0,
    };

    /// Working calendar: a day is 8 hours, a week 5 days.
    pub const BUSINESS_HOURS: TimePolicy = TimePolicy {
        hours_per_day: 8.0,
        days_per_week: 5.0,
        days_per_month: 22.0,
    };

    pub fn new(hours_per_day: f64, days_per_week: f64, days_per_month: f64) -> Self {
        Self {
            hours_per_day,
            days_per_week,
            days_per_month,
        }
    }
}

impl Default for TimePolicy {
    fn default() -> Self {
        TimePolicy::ALL_HOURS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    pub amount: f64,
    pub unit: TimeUnit,
}

impl Duration {
    pub fn of(amount: f64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    pub fn zero() -> Self {
        Self::of(0.0, TimeUnit::Second)
    }

    /// Express this duration in `unit`, interpreting days, weeks and months
    /// according to `policy`.
    pub fn convert(&self, unit: TimeUnit, policy: &TimePolicy) -> Duration {
        if unit == self.unit {
            return *self;
        }
        let seconds = self.to_seconds(policy);
        Duration::of(seconds / unit.seconds(policy), unit)
    }

    pub fn to_seconds(&self, policy: &TimePolicy) -> f64 {
        self.amount * self.unit.seconds(policy)
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0.0
    }

    /// Wall-clock span of this duration, counting days under `policy`.
    /// `None` when the span cannot be represented.
    pub fn to_chrono(&self, policy: &TimePolicy) -> Option<chrono::Duration> {
        calendar_days(self.convert(TimeUnit::Day, policy).amount)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if (self.amount - 1.0).abs() < f64::EPSILON { "" } else { "s" };
        write!(f, "{:.2} {}{}", self.amount, self.unit, plural)
    }
}

/// Offset spanning `days` calendar days (24h each), at microsecond resolution.
///
/// Returns `None` for non-finite input or spans beyond the `i64` microsecond range.
pub fn calendar_days(days: f64) -> Option<chrono::Duration> {
    let micros = (days * MICROS_PER_CALENDAR_DAY).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(chrono::Duration::microseconds(micros as i64))
}
