//! Per-owner work window and break length.

use chrono::NaiveTime;
use clap::Subcommand;
use daywright_core::schedule::clock::format_time;
use daywright_core::storage::SettingsProvider;
use daywright_core::{Config, UserSettings};

use super::{open_db, resolve_owner, time_arg, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the effective settings
    Show,
    /// Store settings for the owner; omitted fields keep their value
    Set {
        /// Work window start (HH:MM)
        #[arg(long, value_parser = time_arg)]
        start: Option<NaiveTime>,
        /// Work window end (HH:MM)
        #[arg(long, value_parser = time_arg)]
        end: Option<NaiveTime>,
        /// Break length in minutes
        #[arg(long = "break")]
        break_minutes: Option<u32>,
    },
}

fn print_settings(settings: &UserSettings, stored: bool) {
    println!("work_start    = {}", format_time(settings.work_start));
    println!("work_end      = {}", format_time(settings.work_end));
    println!("break_minutes = {}", settings.break_minutes);
    if !stored {
        println!("(defaults from config)");
    }
}

pub fn run(action: SettingsAction, owner: Option<String>) -> CmdResult {
    let config = Config::load_or_default();
    let owner = resolve_owner(owner, &config);
    let db = open_db()?;
    let stored = db.user_settings(&owner)?;

    match action {
        SettingsAction::Show => match stored {
            Some(settings) => print_settings(&settings, true),
            None => print_settings(&config.defaults.user_settings(), false),
        },
        SettingsAction::Set {
            start,
            end,
            break_minutes,
        } => {
            let mut settings = stored.unwrap_or_else(|| config.defaults.user_settings());
            if let Some(start) = start {
                settings.work_start = start;
            }
            if let Some(end) = end {
                settings.work_end = end;
            }
            if let Some(minutes) = break_minutes {
                settings.break_minutes = minutes;
            }
            if !settings.is_valid() {
                return Err(format!(
                    "work window {}-{} is empty",
                    format_time(settings.work_start),
                    format_time(settings.work_end)
                )
                .into());
            }
            db.save_user_settings(&owner, &settings)?;
            print_settings(&settings, true);
        }
    }
    Ok(())
}
