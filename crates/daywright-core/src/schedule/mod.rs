//! Calendar inputs around tasks: projects, fixed events, and the user's
//! work-window settings.

pub mod clock;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use crate::task::{Deadline, DeadlineKind, Task, TaskSegment, TaskStatus, TaskTransitionError};

use clock::minutes_of_day;

/// Company label used in project keys when a task has none.
pub const DEFAULT_COMPANY: &str = "Unassigned";
/// Project label used in project keys when a task has none.
pub const DEFAULT_PROJECT: &str = "General";

/// A project that groups related tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub owner: String,
    pub title: String,
    /// 1 = highest
    pub priority: u8,
    pub deadline: Option<Deadline>,
}

impl Project {
    pub fn new(owner: impl Into<String>, title: impl Into<String>, priority: u8) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            title: title.into(),
            priority,
            deadline: None,
        }
    }
}

/// An immovable commitment on a specific date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedEvent {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime, // HH:mm
    pub end_time: NaiveTime,   // HH:mm
    /// Where the event came from ("manual", "google", ...)
    pub source: String,
}

impl FixedEvent {
    pub fn new(
        owner: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            title: title.into(),
            date,
            start_time,
            end_time,
            source: "manual".to_string(),
        }
    }

    /// Busy range in minutes-of-day: the event itself plus one trailing break.
    pub fn occupied_range(&self, break_minutes: i64) -> (i64, i64) {
        (
            minutes_of_day(self.start_time),
            minutes_of_day(self.end_time) + break_minutes,
        )
    }
}

/// Per-user work window and break length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSettings {
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub break_minutes: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            work_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            break_minutes: 15,
        }
    }
}

impl UserSettings {
    /// `[work_start, work_end]` in minutes-of-day.
    pub fn window(&self) -> (i64, i64) {
        (minutes_of_day(self.work_start), minutes_of_day(self.work_end))
    }

    pub fn is_valid(&self) -> bool {
        self.work_start < self.work_end
    }
}

/// Lookup of a user's projects, for effective priority and project keys.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    by_id: HashMap<String, Project>,
}

impl ProjectIndex {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self {
            by_id: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.by_id.get(id)
    }

    fn project_of(&self, task: &Task) -> Option<&Project> {
        task.project_id.as_deref().and_then(|id| self.get(id))
    }

    /// The more urgent of the task's and its project's priority.
    pub fn effective_priority(&self, task: &Task) -> u8 {
        match self.project_of(task) {
            Some(project) => task.priority.min(project.priority),
            None => task.priority,
        }
    }

    /// `"<company> · <project>"`, used to match the focus key.
    pub fn project_key(&self, task: &Task) -> String {
        let company = task
            .company
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_COMPANY);
        let project = self
            .project_of(task)
            .map(|p| p.title.as_str())
            .or(task.project.as_deref())
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PROJECT);
        format!("{company} · {project}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock::{parse_date, parse_time_of_day};

    fn day() -> NaiveDate {
        parse_date("2026-10-19").unwrap()
    }

    #[test]
    fn project_key_defaults() {
        let index = ProjectIndex::default();
        let task = Task::new("u", "t", day());
        assert_eq!(index.project_key(&task), "Unassigned · General");

        let task = Task::new("u", "t", day()).with_project(Some("Acme"), Some(""));
        assert_eq!(index.project_key(&task), "Acme · General");
    }

    #[test]
    fn project_reference_wins_over_label() {
        let project = Project::new("u", "Website", 3);
        let mut task = Task::new("u", "t", day()).with_project(Some("Acme"), Some("Old label"));
        task.project_id = Some(project.id.clone());
        let index = ProjectIndex::new([project]);
        assert_eq!(index.project_key(&task), "Acme · Website");
    }

    #[test]
    fn effective_priority_takes_most_urgent() {
        let project = Project::new("u", "Urgent", 1);
        let mut task = Task::new("u", "t", day()).with_priority(3);
        task.project_id = Some(project.id.clone());
        let index = ProjectIndex::new([project]);
        assert_eq!(index.effective_priority(&task), 1);

        let orphan = Task::new("u", "t", day()).with_priority(3);
        assert_eq!(index.effective_priority(&orphan), 3);
    }

    #[test]
    fn fixed_event_occupies_trailing_break() {
        let event = FixedEvent::new(
            "u",
            "Standup",
            day(),
            parse_time_of_day("10:00").unwrap(),
            parse_time_of_day("10:30").unwrap(),
        );
        assert_eq!(event.occupied_range(15), (600, 645));
    }

    #[test]
    fn default_settings() {
        let settings = UserSettings::default();
        assert_eq!(settings.window(), (540, 1020));
        assert_eq!(settings.break_minutes, 15);
        assert!(settings.is_valid());
    }

    #[test]
    fn fixed_event_serialization() {
        let event = FixedEvent::new(
            "u",
            "Morning standup",
            day(),
            parse_time_of_day("09:00").unwrap(),
            parse_time_of_day("09:30").unwrap(),
        );
        let json = serde_json::to_string(&event).unwrap();
        let decoded: FixedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
