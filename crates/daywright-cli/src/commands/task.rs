//! Task management commands for CLI.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::Subcommand;
use daywright_core::schedule::clock::format_time;
use daywright_core::storage::TaskStore;
use daywright_core::{Config, DateRange, DeadlineKind, ScheduleEngine, Task, TaskPatch};

use super::{
    date_arg, deadline, deadline_kind_arg, estimate_arg, id_list, instant_arg, now, open_db,
    resolve_owner, time_arg, today, truncate, CmdResult,
};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Scheduled date (default: today)
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        /// Fixed start time (HH:MM); requires --end
        #[arg(long, value_parser = time_arg, requires = "end")]
        start: Option<NaiveTime>,
        /// Fixed end time (HH:MM); requires --start
        #[arg(long, value_parser = time_arg, requires = "start")]
        end: Option<NaiveTime>,
        /// Estimated duration in hours
        #[arg(long, value_parser = estimate_arg)]
        estimate: Option<f64>,
        /// Priority, 1 = highest (default: 2)
        #[arg(long)]
        priority: Option<u8>,
        /// Company label
        #[arg(long)]
        company: Option<String>,
        /// Project label
        #[arg(long)]
        project: Option<String>,
        /// Project ID from `project list`
        #[arg(long)]
        project_id: Option<String>,
        /// Deadline date
        #[arg(long, value_parser = date_arg)]
        deadline: Option<NaiveDate>,
        /// Deadline kind: hard or soft
        #[arg(long, value_parser = deadline_kind_arg, default_value = "soft")]
        deadline_kind: DeadlineKind,
        /// Comma-separated IDs of tasks this one waits on
        #[arg(long)]
        depends_on: Option<String>,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Mark as milestone
        #[arg(long)]
        milestone: bool,
    },
    /// List tasks
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
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New date
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        /// New start time; requires --end
        #[arg(long, value_parser = time_arg, requires = "end")]
        start: Option<NaiveTime>,
        /// New end time; requires --start
        #[arg(long, value_parser = time_arg, requires = "start")]
        end: Option<NaiveTime>,
        /// Remove start and end times
        #[arg(long, conflicts_with_all = ["start", "end"])]
        clear_times: bool,
        /// New estimate in hours
        #[arg(long, value_parser = estimate_arg)]
        estimate: Option<f64>,
        /// New priority
        #[arg(long)]
        priority: Option<u8>,
        /// New deadline date
        #[arg(long, value_parser = date_arg)]
        deadline: Option<NaiveDate>,
        /// Deadline kind for --deadline
        #[arg(long, value_parser = deadline_kind_arg, default_value = "soft")]
        deadline_kind: DeadlineKind,
        /// Replace dependencies (comma-separated IDs; empty clears)
        #[arg(long)]
        depends_on: Option<String>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete tasks and their segments
    Rm {
        /// Task IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Mark a task in progress
    Start {
        /// Task ID
        id: String,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = instant_arg)]
        at: Option<NaiveDateTime>,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: String,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = instant_arg)]
        at: Option<NaiveDateTime>,
    },
    /// Mark a continuation segment in progress
    SegmentStart {
        /// Segment ID from `task segments`
        id: String,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = instant_arg)]
        at: Option<NaiveDateTime>,
    },
    /// Mark a continuation segment completed
    SegmentDone {
        /// Segment ID from `task segments`
        id: String,
    },
    /// List continuation segments
    Segments {
        /// First date (inclusive)
        #[arg(long, value_parser = date_arg)]
        from: Option<NaiveDate>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_task_line(task: &Task) {
    let time = match (task.start_time, task.end_time) {
        (Some(s), Some(e)) => format!("{}-{}", format_time(s), format_time(e)),
        _ => "untimed".to_string(),
    };
    let estimate = task
        .estimated_hours
        .map(|h| format!("{h}h"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {} {:<11}  {:<11}  p{}  {:>5}  {}",
        task.id,
        task.date,
        time,
        task.status.as_str(),
        task.priority,
        estimate,
        truncate(&task.title, 40)
    );
}

pub fn run(action: TaskAction, owner: Option<String>) -> CmdResult {
    let config = Config::load_or_default();
    let owner = resolve_owner(owner, &config);
    let db = open_db()?;

    match action {
        TaskAction::Add {
            title,
            date,
            start,
            end,
            estimate,
            priority,
            company,
            project,
            project_id,
            deadline: deadline_date,
            deadline_kind,
            depends_on,
            notes,
            milestone,
        } => {
            let mut task = Task::new(owner, title, date.unwrap_or_else(today))
                .with_project(company.as_deref(), project.as_deref());
            if let (Some(start), Some(end)) = (start, end) {
                task = task.with_time(start, end);
            }
            if let Some(hours) = estimate {
                task = task.with_estimate(hours);
            }
            if let Some(priority) = priority {
                task = task.with_priority(priority.max(1));
            }
            if let Some(deadline) = deadline(deadline_date, deadline_kind) {
                task = task.with_deadline(deadline);
            }
            if let Some(ids) = depends_on {
                task = task.with_dependencies(id_list(&ids));
            }
            task.project_id = project_id;
            task.notes = notes;
            task.is_milestone = milestone;
            task.validate()?;

            db.insert_tasks(std::slice::from_ref(&task))?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { from, to, json } => {
            let range = DateRange { from, to };
            let tasks = db.list_tasks(&owner, range)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("No tasks.");
            } else {
                for task in &tasks {
                    print_task_line(task);
                }
            }
        }
        TaskAction::Get { id } => match db.get_task(&id)? {
            Some(task) => println!("{}", serde_json::to_string_pretty(&task)?),
            None => return Err(format!("Task not found: {id}").into()),
        },
        TaskAction::Update {
            id,
            title,
            date,
            start,
            end,
            clear_times,
            estimate,
            priority,
            deadline: deadline_date,
            deadline_kind,
            depends_on,
            notes,
        } => {
            let mut patch = TaskPatch {
                title,
                date,
                estimated_hours: estimate.map(Some),
                priority: priority.map(|p| p.max(1)),
                deadline: deadline(deadline_date, deadline_kind).map(Some),
                dependencies: depends_on.as_deref().map(id_list),
                notes: notes.map(Some),
                ..TaskPatch::default()
            };
            if let (Some(start), Some(end)) = (start, end) {
                patch.start_time = Some(Some(start));
                patch.end_time = Some(Some(end));
            }
            if clear_times {
                patch.start_time = Some(None);
                patch.end_time = Some(None);
            }
            if patch.is_empty() {
                return Err("nothing to update".into());
            }

            db.update_task(&id, &patch)?;
            let task = db.get_task(&id)?.ok_or(format!("Task not found: {id}"))?;
            println!("Task updated:");
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Rm { ids } => {
            let removed = db.delete_tasks(&ids)?;
            println!("Deleted {removed} task(s)");
        }
        TaskAction::Start { id, at } => {
            let engine = ScheduleEngine::new(&db);
            let task = engine.start_task(&id, at.unwrap_or_else(now))?;
            println!("Task started: {}", task.id);
        }
        TaskAction::Complete { id, at } => {
            let engine = ScheduleEngine::new(&db);
            let completion = engine.complete_task(&id, at.unwrap_or_else(now))?;
            println!("Task completed: {}", completion.task.id);
            if let Some(sample) = completion.sample {
                println!("Overrun: {} min", sample.overrun_minutes);
            }
            if completion.closed_segments + completion.dropped_segments > 0 {
                println!(
                    "Segments: {} closed, {} dropped",
                    completion.closed_segments, completion.dropped_segments
                );
            }
        }
        TaskAction::SegmentStart { id, at } => {
            let engine = ScheduleEngine::new(&db);
            let segment = engine.start_segment(&id, at.unwrap_or_else(now))?;
            println!("Segment started: {} (task {})", segment.id, segment.task_id);
        }
        TaskAction::SegmentDone { id } => {
            let engine = ScheduleEngine::new(&db);
            let segment = engine.complete_segment(&id)?;
            println!("Segment completed: {} (task {})", segment.id, segment.task_id);
        }
        TaskAction::Segments { from, json } => {
            let range = DateRange { from, to: None };
            let segments = db.list_segments(&owner, range)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&segments)?);
            } else if segments.is_empty() {
                println!("No segments.");
            } else {
                for s in &segments {
                    println!(
                        "{}  {} {}-{}  #{}  {:<11}  task {}",
                        s.id,
                        s.date,
                        format_time(s.start_time),
                        format_time(s.end_time),
                        s.order,
                        s.status.as_str(),
                        s.task_id
                    );
                }
            }
        }
    }
    Ok(())
}
