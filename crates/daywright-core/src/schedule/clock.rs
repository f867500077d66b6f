//! Workday calendar arithmetic: minutes-of-day, weekend skipping, and
//! lenient parsing of user-supplied dates, times and estimates.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Last representable minute of a day (23:59).
pub const LAST_MINUTE: i64 = MINUTES_PER_DAY - 1;

/// Minutes elapsed since midnight.
pub fn minutes_of_day(time: NaiveTime) -> i64 {
    (time.hour() * 60 + time.minute()) as i64
}

/// Convert minutes-of-day back to a time, clamped to 00:00..=23:59.
pub fn time_from_minutes(minutes: i64) -> NaiveTime {
    let clamped = minutes.clamp(0, LAST_MINUTE);
    NaiveTime::from_hms_opt((clamped / 60) as u32, (clamped % 60) as u32, 0)
        .unwrap_or(NaiveTime::MIN)
}

/// Parse `HH:MM` (or `HH:MM:SS`). Anything else is "no value".
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
        .map(|t| t.with_second(0).unwrap_or(t))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parse an ISO `YYYY-MM-DD` date. Invalid dates are "no value".
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse an hour estimate. Non-numeric, non-finite or non-positive input
/// yields `None`.
pub fn parse_estimate_hours(value: &str) -> Option<f64> {
    let hours: f64 = value.trim().parse().ok()?;
    (hours.is_finite() && hours > 0.0).then_some(hours)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The first weekday at or after `date`.
pub fn next_workday(date: NaiveDate) -> NaiveDate {
    let mut day = date;
    while is_weekend(day) {
        day = day + Duration::days(1);
    }
    day
}
