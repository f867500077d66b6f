//! TOML-based application configuration.
//!
//! Stores:
//! - Scheduler tuning (chunk caps, focus burst ratio, horizon, cycle policy)
//! - Defaults for the CLI (owner, work window, break length)
//!
//! Configuration is stored at `~/.config/daywright/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;
use crate::schedule::clock::parse_time_of_day;
use crate::schedule::UserSettings;

/// Fallbacks used when the store has no settings for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Owner id used by CLI commands without `--owner`
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_work_start")]
    pub work_start: String,
    #[serde(default = "default_work_end")]
    pub work_end: String,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/daywright/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

// Default functions
fn default_owner() -> String {
    "local".into()
}
fn default_work_start() -> String {
    "09:00".into()
}
fn default_work_end() -> String {
    "17:00".into()
}
fn default_break_minutes() -> u32 {
    15
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            work_start: default_work_start(),
            work_end: default_work_end(),
            break_minutes: default_break_minutes(),
        }
    }
}

impl DefaultsConfig {
    /// Work window and break as settings; invalid values fall back to
    /// 09:00/17:00.
    pub fn user_settings(&self) -> UserSettings {
        let fallback = UserSettings::default();
        let settings = UserSettings {
            work_start: parse_time_of_day(&self.work_start).unwrap_or(fallback.work_start),
            work_end: parse_time_of_day(&self.work_end).unwrap_or(fallback.work_end),
            break_minutes: self.break_minutes,
        };
        if settings.is_valid() {
            settings
        } else {
            UserSettings {
                break_minutes: self.break_minutes,
                ..fallback
            }
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file inside the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is rejected.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        let s = &self.scheduler;
        if s.chunk_minutes < 1 {
            return Err(invalid("scheduler.chunk_minutes", "must be at least 1"));
        }
        if s.focus_chunk_minutes < 1 {
            return Err(invalid("scheduler.focus_chunk_minutes", "must be at least 1"));
        }
        if s.focus_burst < 1 {
            return Err(invalid("scheduler.focus_burst", "must be at least 1"));
        }
        if s.normal_burst < 1 {
            return Err(invalid("scheduler.normal_burst", "must be at least 1"));
        }
        if s.horizon_days < 1 {
            return Err(invalid("scheduler.horizon_days", "must be at least 1"));
        }
        if s.sample_window < 1 {
            return Err(invalid("scheduler.sample_window", "must be at least 1"));
        }

        let d = &self.defaults;
        let start = parse_time_of_day(&d.work_start)
            .ok_or_else(|| invalid("defaults.work_start", "expected HH:MM"))?;
        let end = parse_time_of_day(&d.work_end)
            .ok_or_else(|| invalid("defaults.work_end", "expected HH:MM"))?;
        if start >= end {
            return Err(invalid("defaults.work_end", "must be after defaults.work_start"));
        }
        if d.owner.trim().is_empty() {
            return Err(invalid("defaults.owner", "must not be empty"));
        }
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "using default configuration");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::CyclePolicy;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.scheduler.chunk_minutes, 90);
        assert_eq!(parsed.scheduler.focus_chunk_minutes, 120);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[scheduler]\nfocus_burst = 3\n").unwrap();
        assert_eq!(parsed.scheduler.focus_burst, 3);
        assert_eq!(parsed.scheduler.normal_burst, 1);
        assert_eq!(parsed.scheduler.cycle_policy, CyclePolicy::FailOpen);
        assert_eq!(parsed.defaults.owner, "local");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduler.focus_burst").as_deref(), Some("2"));
        assert_eq!(cfg.get("scheduler.cycle_policy").as_deref(), Some("fail_open"));
        assert_eq!(cfg.get("defaults.work_start").as_deref(), Some("09:00"));
        assert!(cfg.get("scheduler.missing_key").is_none());
    }

    #[test]
    fn set_value_updates_number_and_enum() {
        let mut cfg = Config::default();
        cfg.set_value("scheduler.chunk_minutes", "60").unwrap();
        cfg.set_value("scheduler.cycle_policy", "reject").unwrap();
        assert_eq!(cfg.scheduler.chunk_minutes, 60);
        assert_eq!(cfg.scheduler.cycle_policy, CyclePolicy::Reject);
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("scheduler.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set_value("scheduler", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_value_rejects_bad_values() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("scheduler.focus_burst", "0").is_err());
        assert!(cfg.set_value("scheduler.chunk_minutes", "abc").is_err());
        assert!(cfg.set_value("scheduler.cycle_policy", "sometimes").is_err());
        assert!(cfg.set_value("defaults.work_end", "08:00").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set_value("defaults.owner", "alice").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().defaults.owner, "alice");
    }

    #[test]
    fn invalid_window_falls_back() {
        let defaults = DefaultsConfig {
            work_start: "18:00".into(),
            work_end: "09:00".into(),
            break_minutes: 5,
            ..DefaultsConfig::default()
        };
        let settings = defaults.user_settings();
        assert_eq!(settings.window(), (540, 1020));
        assert_eq!(settings.break_minutes, 5);
    }
}
