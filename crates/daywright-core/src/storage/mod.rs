mod config;
pub mod migrations;
pub mod schedule_db;
pub mod traits;

pub use config::{Config, DefaultsConfig};
pub use schedule_db::ScheduleDb;
pub use traits::{
    Backend, BehaviorLog, DateRange, FixedEventStore, ProjectRegistry, SegmentPatch,
    SettingsProvider, TaskPatch, TaskStore,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it when missing.
///
/// `DAYWRIGHT_HOME` wins when set. Otherwise `~/.config/daywright/`, or
/// `~/.config/daywright-dev/` with `DAYWRIGHT_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("DAYWRIGHT_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DAYWRIGHT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("daywright-dev")
            } else {
                base_dir.join("daywright")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
