//! "Today" upkeep: roll stale work forward and reconcile overruns.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::Subcommand;
use daywright_core::schedule::clock::format_time;
use daywright_core::task::reconciliation::Overrun;
use daywright_core::{Config, ReconcileOutcome, ScheduleEngine};

use super::{date_arg, instant_arg, now, open_db, resolve_owner, today, CmdResult};

#[derive(Subcommand)]
pub enum TodayAction {
    /// Roll stale work forward, then correct any overrun
    Refresh {
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = instant_arg)]
        at: Option<NaiveDateTime>,
    },
    /// Move unfinished work dated before today to the next workday
    RollForward {
        /// Treat this date as today
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
}

fn print_overrun(overrun: &Overrun, new_end: NaiveTime) {
    let chunk = match &overrun.segment_id {
        Some(segment) => format!("{} (segment {segment})", overrun.task_id),
        None => overrun.task_id.clone(),
    };
    println!(
        "Overrun of {} min on {chunk}; extended to {}",
        overrun.minutes(),
        format_time(new_end)
    );
}

fn print_reconcile(outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::NoOverrun => println!("No overrun."),
        ReconcileOutcome::Shifted { overrun, plan } => {
            print_overrun(overrun, plan.extended.end);
            println!(
                "Shifted {} task(s) and {} segment(s)",
                plan.tasks.len(),
                plan.segments.len()
            );
        }
        ReconcileOutcome::Delegated {
            overrun,
            plan,
            placed,
            unplaced,
        } => {
            print_overrun(overrun, plan.extended.end);
            println!(
                "Rescheduled around fixed events: {} cleared, {} placed",
                plan.cleared.len(),
                placed
            );
            if !unplaced.is_empty() {
                println!("Unplaced: {}", unplaced.join(", "));
            }
        }
    }
}

pub fn run(action: TodayAction, owner: Option<String>) -> CmdResult {
    let config = Config::load_or_default();
    let owner = resolve_owner(owner, &config);
    let db = open_db()?;
    let engine = ScheduleEngine::new(&db)
        .with_config(config.scheduler.clone())
        .with_fallback_settings(config.defaults.user_settings());

    match action {
        TodayAction::Refresh { at } => {
            let refresh = engine.refresh_today(&owner, at.unwrap_or_else(now))?;
            println!("Rolled forward: {}", refresh.rolled.len());
            print_reconcile(&refresh.reconcile);
        }
        TodayAction::RollForward { date } => {
            let plan = engine.roll_forward(&owner, date.unwrap_or_else(today))?;
            println!("Rolled forward: {}", plan.len());
            for moved in &plan.tasks {
                println!("  task {}  {} -> {}", moved.id, moved.from, moved.to);
            }
            for moved in &plan.segments {
                println!("  segment {}  {} -> {}", moved.id, moved.from, moved.to);
            }
        }
    }
    Ok(())
}
