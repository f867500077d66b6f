//! Project management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use daywright_core::storage::ProjectRegistry;
use daywright_core::{Config, DeadlineKind, Project};

use super::{date_arg, deadline, deadline_kind_arg, open_db, resolve_owner, CmdResult};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Add {
        /// Project title
        title: String,
        /// Priority, 1 = highest
        #[arg(long, default_value_t = 2)]
        priority: u8,
        /// Deadline date
        #[arg(long, value_parser = date_arg)]
        deadline: Option<NaiveDate>,
        /// Deadline kind: hard or soft
        #[arg(long, value_parser = deadline_kind_arg, default_value = "soft")]
        deadline_kind: DeadlineKind,
    },
    /// List all projects
    List,
    /// Delete a project
    Rm {
        /// Project ID
        id: String,
    },
}

pub fn run(action: ProjectAction, owner: Option<String>) -> CmdResult {
    let config = Config::load_or_default();
    let owner = resolve_owner(owner, &config);
    let db = open_db()?;

    match action {
        ProjectAction::Add {
            title,
            priority,
            deadline: deadline_date,
            deadline_kind,
        } => {
            let mut project = Project::new(owner, title, priority.max(1));
            project.deadline = deadline(deadline_date, deadline_kind);
            db.insert_project(&project)?;
            println!("Project created: {}", project.id);
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        ProjectAction::List => {
            let projects = db.list_projects(&owner)?;
            println!("{}", serde_json::to_string_pretty(&projects)?);
        }
        ProjectAction::Rm { id } => {
            db.delete_project(&id)?;
            println!("Project deleted: {id}");
        }
    }
    Ok(())
}
