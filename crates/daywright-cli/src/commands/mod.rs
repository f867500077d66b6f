//! Subcommands and the argument helpers they share.

pub mod config;
pub mod event;
pub mod project;
pub mod schedule;
pub mod settings;
pub mod task;
pub mod today;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use daywright_core::schedule::clock::{parse_date, parse_estimate_hours, parse_time_of_day};
use daywright_core::{Config, Deadline, DeadlineKind, ScheduleDb};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the schedule database in the data directory.
pub fn open_db() -> Result<ScheduleDb, Box<dyn std::error::Error>> {
    let db = ScheduleDb::open()?;
    tracing::debug!("schedule database opened");
    Ok(db)
}

/// The explicit `--owner`, else the configured default.
pub fn resolve_owner(owner: Option<String>, config: &Config) -> String {
    let owner = owner
        .filter(|o| !o.trim().is_empty())
        .unwrap_or_else(|| config.defaults.owner.clone());
    tracing::debug!(%owner, "resolved owner");
    owner
}

pub fn date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

pub fn time_arg(value: &str) -> Result<NaiveTime, String> {
    parse_time_of_day(value).ok_or_else(|| format!("invalid time '{value}', expected HH:MM"))
}

pub fn estimate_arg(value: &str) -> Result<f64, String> {
    parse_estimate_hours(value)
        .ok_or_else(|| format!("invalid estimate '{value}', expected positive hours"))
}

/// Parse `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD HH:MM`.
pub fn instant_arg(value: &str) -> Result<NaiveDateTime, String> {
    let trimmed = value.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| format!("invalid instant '{value}', expected YYYY-MM-DDTHH:MM"))
}

pub fn deadline_kind_arg(value: &str) -> Result<DeadlineKind, String> {
    DeadlineKind::parse(value).ok_or_else(|| format!("invalid deadline kind '{value}', expected hard or soft"))
}

pub fn deadline(date: Option<NaiveDate>, kind: DeadlineKind) -> Option<Deadline> {
    date.map(|date| Deadline { date, kind })
}

/// Split a comma-separated id list, dropping blanks.
pub fn id_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn today() -> NaiveDate {
    now().date()
}

/// Shorten to `max` characters, marking the cut with `~`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}~")
    }
}
