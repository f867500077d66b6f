//! Automatic scheduling commands.

use chrono::NaiveDate;
use clap::Subcommand;
use daywright_core::schedule::clock::format_time;
use daywright_core::stats::{render_workload, workload_by_project};
use daywright_core::storage::{ProjectRegistry, TaskStore};
use daywright_core::{Config, DateRange, PlacementKind, ProjectIndex, ScheduleEngine, ScheduleRequest};

use super::{date_arg, open_db, resolve_owner, today, CmdResult};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Place estimated, un-timed tasks into free time
    Run {
        /// First day to schedule (default: today)
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        /// Project key to favour ("<company> · <project>"); reschedules everything
        #[arg(long)]
        focus: Option<String>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scheduled minutes per project key
    Balance {
        /// First date (default: today)
        #[arg(long, value_parser = date_arg)]
        from: Option<NaiveDate>,
        /// Last date (inclusive)
        #[arg(long, value_parser = date_arg)]
        to: Option<NaiveDate>,
    },
}

pub fn run(action: ScheduleAction, owner: Option<String>) -> CmdResult {
    let config = Config::load_or_default();
    let owner = resolve_owner(owner, &config);
    let db = open_db()?;

    match action {
        ScheduleAction::Run { date, focus, json } => {
            let engine = ScheduleEngine::new(&db)
                .with_config(config.scheduler.clone())
                .with_fallback_settings(config.defaults.user_settings());
            let request =
                ScheduleRequest::new(owner, date.unwrap_or_else(today)).with_focus(focus);
            let outcome = engine.schedule(&request)?;
            let plan = &outcome.plan;

            if json {
                let value = serde_json::json!({
                    "placements": plan.placements,
                    "unplaced": plan.unplaced,
                    "cyclic": plan.report.cyclic,
                    "blocked": plan.report.blocked,
                    "fell_back": plan.fell_back,
                    "bias_minutes": outcome.bias.minutes,
                    "cleared_segments": outcome.cleared_segments,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            if plan.is_empty() {
                println!("Nothing to schedule.");
            }
            for p in &plan.placements {
                let marker = match p.kind {
                    PlacementKind::Primary => "task",
                    PlacementKind::Continuation => "cont",
                };
                println!(
                    "{} {}-{}  {} #{}  {}",
                    p.date,
                    format_time(p.start),
                    format_time(p.end),
                    marker,
                    p.order + 1,
                    p.task_id
                );
            }
            if outcome.bias.is_active() {
                println!("Bias: {}", outcome.bias.describe());
            }
            if plan.report.has_cycle() {
                println!(
                    "Warning: dependency cycle among {} task(s); scheduled in priority order",
                    plan.report.cyclic.len()
                );
            } else if plan.fell_back {
                println!("Warning: some dependencies could not be ordered; scheduled in priority order");
            }
            if !plan.unplaced.is_empty() {
                println!("Unplaced: {}", plan.unplaced.join(", "));
            }
        }
        ScheduleAction::Balance { from, to } => {
            let range = DateRange {
                from: Some(from.unwrap_or_else(today)),
                to,
            };
            let tasks = db.list_tasks(&owner, range)?;
            let segments = db.list_segments(&owner, range)?;
            let projects = ProjectIndex::new(db.list_projects(&owner)?);
            let rows = workload_by_project(&tasks, &segments, &projects);
            print!("{}", render_workload(&rows));
        }
    }
    Ok(())
}
