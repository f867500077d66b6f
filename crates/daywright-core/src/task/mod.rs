//! Task records and their lifecycle.
//!
//! A task owns at most one time range of its own (its first scheduled
//! chunk). Later chunks of the same work are [`TaskSegment`]s keyed by the
//! parent task id, so one logical task can span several slots and days.

pub mod carry_over;
pub mod reconciliation;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::schedule::clock::{format_time, minutes_of_day};

/// Priority assigned when the user gives none. Lower is more urgent.
pub const DEFAULT_PRIORITY: u8 = 2;

/// Task status.
///
/// Valid transitions:
/// - PLANNED → IN_PROGRESS (start)
/// - PLANNED → COMPLETED (tick off without tracking)
/// - IN_PROGRESS → COMPLETED
/// - IN_PROGRESS → PLANNED (put back)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &TaskStatus) -> bool {
        match self {
            TaskStatus::Planned => matches!(to, TaskStatus::InProgress | TaskStatus::Completed),
            TaskStatus::InProgress => matches!(to, TaskStatus::Completed | TaskStatus::Planned),
            TaskStatus::Completed => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Planned => "planned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Parse a stored status, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planned" => Some(TaskStatus::Planned),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    Hard,
    Soft,
}

impl DeadlineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineKind::Hard => "hard",
            DeadlineKind::Soft => "soft",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hard" => Some(DeadlineKind::Hard),
            "soft" => Some(DeadlineKind::Soft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deadline {
    pub date: NaiveDate,
    pub kind: DeadlineKind,
}

impl Deadline {
    pub fn hard(date: NaiveDate) -> Self {
        Self {
            date,
            kind: DeadlineKind::Hard,
        }
    }

    pub fn soft(date: NaiveDate) -> Self {
        Self {
            date,
            kind: DeadlineKind::Soft,
        }
    }
}

/// A unit of work on the user's calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub owner: String,
    pub title: String,
    /// Free-text company label (first half of the project key)
    pub company: Option<String>,
    /// Free-text project label (second half of the project key)
    pub project: Option<String>,
    /// Reference into the project registry
    pub project_id: Option<String>,
    /// Scheduled date
    pub date: NaiveDate,
    /// Start time-of-day; present iff `end_time` is present
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_milestone: bool,
    /// Estimated duration in hours (null if not set)
    pub estimated_hours: Option<f64>,
    pub status: TaskStatus,
    pub actual_start: Option<NaiveDateTime>,
    pub actual_end: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    /// 1 = highest
    pub priority: u8,
    pub deadline: Option<Deadline>,
    /// Ids of tasks this one waits on. Dangling ids are allowed.
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Task {
    /// Create a planned, untimed task with default values.
    pub fn new(owner: impl Into<String>, title: impl Into<String>, date: NaiveDate) -> Self {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            title: title.into(),
            company: None,
            project: None,
            project_id: None,
            date,
            start_time: None,
            end_time: None,
            is_milestone: false,
            estimated_hours: None,
            status: TaskStatus::Planned,
            actual_start: None,
            actual_end: None,
            completed_at: None,
            priority: DEFAULT_PRIORITY,
            deadline: None,
            dependencies: Vec::new(),
            notes: None,
            created_at: chrono::Local::now().naive_local(),
        }
    }

    pub fn with_estimate(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    pub fn with_time(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_project(mut self, company: Option<&str>, project: Option<&str>) -> Self {
        self.company = company.map(str::to_string);
        self.project = project.map(str::to_string);
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// `[start, end]` in minutes-of-day when the task is time-boxed.
    pub fn time_range(&self) -> Option<(i64, i64)> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((minutes_of_day(start), minutes_of_day(end))),
            _ => None,
        }
    }

    pub fn is_time_boxed(&self) -> bool {
        self.time_range().is_some()
    }

    /// Estimate in minutes, when the estimate is usable for scheduling.
    pub fn estimated_minutes(&self) -> Option<f64> {
        self.estimated_hours
            .filter(|h| h.is_finite() && *h > 0.0)
            .map(|h| h * 60.0)
    }

    /// Check the start/end pairing invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.start_time, self.end_time) {
            (None, None) => Ok(()),
            (Some(start), Some(end)) if start <= end => Ok(()),
            (start, end) => Err(ValidationError::InvalidTimeRange {
                start: start.map(format_time),
                end: end.map(format_time),
            }),
        }
    }

    /// Transition to a new status, stamping the lifecycle timestamps.
    pub fn transition_to(
        &mut self,
        new_status: TaskStatus,
        now: NaiveDateTime,
    ) -> Result<(), TaskTransitionError> {
        if !self.status.can_transition_to(&new_status) {
            return Err(TaskTransitionError {
                task_id: self.id.clone(),
                from: self.status,
                to: new_status,
            });
        }

        match new_status {
            TaskStatus::InProgress => {
                self.actual_start = Some(now);
                self.actual_end = None;
            }
            TaskStatus::Completed => {
                if self.actual_start.is_none() {
                    self.actual_start = Some(now);
                }
                self.actual_end = Some(now);
                self.completed_at = Some(now);
            }
            TaskStatus::Planned => {
                self.actual_start = None;
            }
        }

        self.status = new_status;
        Ok(())
    }
}

/// A later chunk of a task, placed in its own slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSegment {
    pub id: String,
    /// The task this chunk belongs to
    pub task_id: String,
    pub owner: String,
    /// 1-based position among the task's segments, in placement order
    pub order: u32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: TaskStatus,
}

impl TaskSegment {
    pub fn new(
        task_id: impl Into<String>,
        owner: impl Into<String>,
        order: u32,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            owner: owner.into(),
            order,
            date,
            start_time,
            end_time,
            status: TaskStatus::Planned,
        }
    }

    pub fn time_range(&self) -> (i64, i64) {
        (minutes_of_day(self.start_time), minutes_of_day(self.end_time))
    }

    pub fn duration_minutes(&self) -> i64 {
        let (start, end) = self.time_range();
        end - start
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Move to a new status under the same rules as tasks.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<(), TaskTransitionError> {
        if !self.status.can_transition_to(&new_status) {
            return Err(TaskTransitionError {
                task_id: self.id.clone(),
                from: self.status,
                to: new_status,
            });
        }
        self.status = new_status;
        Ok(())
    }
}

/// Error returned when an invalid status transition is attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskTransitionError {
    pub task_id: String,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

impl fmt::Display for TaskTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status transition for task {}: {} → {}",
            self.task_id, self.from, self.to
        )
    }
}

impl std::error::Error for TaskTransitionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::clock::{parse_date, parse_time_of_day};

    fn at(date: &str, time: &str) -> NaiveDateTime {
        parse_date(date)
            .unwrap()
            .and_time(parse_time_of_day(time).unwrap())
    }

    fn task() -> Task {
        Task::new("user-1", "Write report", parse_date("2026-10-19").unwrap())
    }

    #[test]
    fn new_task_defaults() {
        let t = task();
        assert_eq!(t.status, TaskStatus::Planned);
        assert_eq!(t.priority, DEFAULT_PRIORITY);
        assert!(!t.is_time_boxed());
        assert!(t.estimated_minutes().is_none());
    }

    #[test]
    fn estimate_must_be_positive() {
        assert_eq!(task().with_estimate(1.5).estimated_minutes(), Some(90.0));
        assert!(task().with_estimate(0.0).estimated_minutes().is_none());
        assert!(task().with_estimate(f64::NAN).estimated_minutes().is_none());
    }

    #[test]
    fn validate_rejects_half_present_range() {
        let mut t = task();
        t.start_time = parse_time_of_day("09:00");
        assert!(t.validate().is_err());

        let t = task().with_time(
            parse_time_of_day("11:00").unwrap(),
            parse_time_of_day("10:00").unwrap(),
        );
        assert!(t.validate().is_err());

        let t = task().with_time(
            parse_time_of_day("10:00").unwrap(),
            parse_time_of_day("11:00").unwrap(),
        );
        assert!(t.validate().is_ok());
        assert_eq!(t.time_range(), Some((600, 660)));
    }

    #[test]
    fn start_then_complete_stamps_timestamps() {
        let mut t = task();
        t.transition_to(TaskStatus::InProgress, at("2026-10-19", "09:00"))
            .unwrap();
        assert_eq!(t.actual_start, Some(at("2026-10-19", "09:00")));

        t.transition_to(TaskStatus::Completed, at("2026-10-19", "10:10"))
            .unwrap();
        assert_eq!(t.actual_end, Some(at("2026-10-19", "10:10")));
        assert_eq!(t.completed_at, Some(at("2026-10-19", "10:10")));
    }

    #[test]
    fn completed_is_terminal() {
        let mut t = task();
        t.transition_to(TaskStatus::Completed, at("2026-10-19", "09:00"))
            .unwrap();
        let err = t
            .transition_to(TaskStatus::InProgress, at("2026-10-19", "09:05"))
            .unwrap_err();
        assert_eq!(err.from, TaskStatus::Completed);
        assert_eq!(err.to, TaskStatus::InProgress);
    }

    #[test]
    fn status_parse_is_lenient_on_case() {
        assert_eq!(TaskStatus::parse("In_Progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("bogus"), None);
    }

    #[test]
    fn segment_follows_task_rules() {
        let parent = task();
        let mut segment = TaskSegment::new(
            parent.id.clone(),
            "u",
            1,
            parent.date,
            parse_time_of_day("11:00").unwrap(),
            parse_time_of_day("12:00").unwrap(),
        );
        assert_eq!(segment.starts_at(), at("2026-10-19", "11:00"));
        segment.transition_to(TaskStatus::InProgress).unwrap();
        segment.transition_to(TaskStatus::Completed).unwrap();
        assert!(segment.is_completed());
        let err = segment.transition_to(TaskStatus::InProgress).unwrap_err();
        assert_eq!(err.task_id, segment.id);
    }

    #[test]
    fn task_serialization() {
        let t = task()
            .with_estimate(2.0)
            .with_deadline(Deadline::hard(parse_date("2026-10-30").unwrap()))
            .with_dependencies(["other"]);
        let json = serde_json::to_string(&t).unwrap();
        let decoded: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, t);
    }
}
