//! Fixed calendar event commands.

use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;
use daywright_core::schedule::clock::format_time;
use daywright_core::storage::FixedEventStore;
use daywright_core::{Config, DateRange, FixedEvent};

use super::{date_arg, open_db, resolve_owner, time_arg, today, truncate, CmdResult};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a fixed event
    Add {
        /// Event title
        title: String,
        /// Event date (default: today)
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        /// Start time (HH:MM)
        #[arg(long, value_parser = time_arg)]
        start: NaiveTime,
        /// End time (HH:MM)
        #[arg(long, value_parser = time_arg)]
        end: NaiveTime,
        /// Origin tag
        #[arg(long, default_value = "manual")]
        source: String,
    },
    /// List fixed events
    List {
        /// First date (inclusive)
        #[arg(long, value_parser = date_arg)]
        from: Option<NaiveDate>,
        /// Last date (inclusive)
        #[arg(long, value_parser = date_arg)]
        to: Option<NaiveDate>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete fixed events
    Rm {
        /// Event IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub fn run(action: EventAction, owner: Option<String>) -> CmdResult {
    let config = Config::load_or_default();
    let owner = resolve_owner(owner, &config);
    let db = open_db()?;

    match action {
        EventAction::Add {
            title,
            date,
            start,
            end,
            source,
        } => {
            if start >= end {
                return Err(format!(
                    "event end {} must be after start {}",
                    format_time(end),
                    format_time(start)
                )
                .into());
            }
            let mut event = FixedEvent::new(owner, title, date.unwrap_or_else(today), start, end);
            event.source = source;
            db.insert_events(std::slice::from_ref(&event))?;
            println!("Event created: {}", event.id);
        }
        EventAction::List { from, to, json } => {
            let events = db.list_events(&owner, DateRange { from, to })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("No events.");
            } else {
                for e in &events {
                    println!(
                        "{}  {} {}-{}  {:<8}  {}",
                        e.id,
                        e.date,
                        format_time(e.start_time),
                        format_time(e.end_time),
                        e.source,
                        truncate(&e.title, 40)
                    );
                }
            }
        }
        EventAction::Rm { ids } => {
            let removed = db.delete_events(&ids)?;
            println!("Deleted {removed} event(s)");
        }
    }
    Ok(())
}
