//! Collaborator interfaces the engine talks to.
//!
//! Every call is synchronous and may fail with a [`StoreError`]. The engine
//! never retries; the first failure aborts the operation in progress.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, ValidationError};
use crate::schedule::clock::format_time;
use crate::schedule::{Deadline, FixedEvent, Project, Task, TaskSegment, TaskStatus, UserSettings};
use crate::stats::BehavioralSample;

/// Inclusive date bounds; `None` leaves a side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            to: None,
        }
    }

    pub fn until(date: NaiveDate) -> Self {
        Self {
            from: None,
            to: Some(date),
        }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::between(date, date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Named-field update for a task. `None` leaves a field untouched; the
/// nested `Option`s allow clearing nullable fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<Option<NaiveTime>>,
    pub end_time: Option<Option<NaiveTime>>,
    pub estimated_hours: Option<Option<f64>>,
    pub priority: Option<u8>,
    pub deadline: Option<Option<Deadline>>,
    pub dependencies: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub actual_start: Option<Option<NaiveDateTime>>,
    pub actual_end: Option<Option<NaiveDateTime>>,
    pub completed_at: Option<Option<NaiveDateTime>>,
}

impl TaskPatch {
    pub fn date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn times(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start_time: Some(Some(start)),
            end_time: Some(Some(end)),
            ..Self::default()
        }
    }

    /// Date and time range written by the allocator.
    pub fn placement(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            date: Some(date),
            ..Self::times(start, end)
        }
    }

    pub fn clear_times() -> Self {
        Self {
            start_time: Some(None),
            end_time: Some(None),
            ..Self::default()
        }
    }

    /// Status and lifecycle timestamps copied from `task`.
    pub fn lifecycle(task: &Task) -> Self {
        Self {
            status: Some(task.status),
            actual_start: Some(task.actual_start),
            actual_end: Some(task.actual_end),
            completed_at: Some(task.completed_at),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply onto `task`, then check the time-range invariant.
    pub fn apply(&self, task: &mut Task) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(start) = self.start_time {
            task.start_time = start;
        }
        if let Some(end) = self.end_time {
            task.end_time = end;
        }
        if let Some(hours) = self.estimated_hours {
            task.estimated_hours = hours;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(dependencies) = &self.dependencies {
            task.dependencies = dependencies.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(at) = self.actual_start {
            task.actual_start = at;
        }
        if let Some(at) = self.actual_end {
            task.actual_end = at;
        }
        if let Some(at) = self.completed_at {
            task.completed_at = at;
        }
        task.validate()
    }
}

/// Named-field update for a continuation segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentPatch {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: Option<TaskStatus>,
}

impl SegmentPatch {
    pub fn date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn times(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start_time: Some(start),
            end_time: Some(end),
            ..Self::default()
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, segment: &mut TaskSegment) -> Result<(), ValidationError> {
        if let Some(date) = self.date {
            segment.date = date;
        }
        if let Some(start) = self.start_time {
            segment.start_time = start;
        }
        if let Some(end) = self.end_time {
            segment.end_time = end;
        }
        if let Some(status) = self.status {
            segment.status = status;
        }
        if segment.start_time > segment.end_time {
            return Err(ValidationError::InvalidTimeRange {
                start: Some(format_time(segment.start_time)),
                end: Some(format_time(segment.end_time)),
            });
        }
        Ok(())
    }
}

/// Task records and their continuation-segment arena.
pub trait TaskStore {
    /// Tasks of `owner` in `range`, ordered by date then start; untimed last.
    fn list_tasks(&self, owner: &str, range: DateRange) -> Result<Vec<Task>, StoreError>;

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;

    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError>;

    /// Delete tasks and their segments; returns the number of tasks removed.
    fn delete_tasks(&self, ids: &[String]) -> Result<usize, StoreError>;

    /// Segments of `owner` in `range`, ordered by date then start.
    fn list_segments(&self, owner: &str, range: DateRange) -> Result<Vec<TaskSegment>, StoreError>;

    fn get_segment(&self, id: &str) -> Result<Option<TaskSegment>, StoreError>;

    /// Segments of one task, in chunk order.
    fn task_segments(&self, task_id: &str) -> Result<Vec<TaskSegment>, StoreError>;

    /// Replace every segment of `task_id` with `segments`.
    fn replace_segments(&self, task_id: &str, segments: &[TaskSegment]) -> Result<(), StoreError>;

    fn update_segment(&self, id: &str, patch: &SegmentPatch) -> Result<(), StoreError>;

    /// Remove every segment of `owner`; returns how many were removed.
    fn clear_segments(&self, owner: &str) -> Result<usize, StoreError>;
}

pub trait FixedEventStore {
    fn list_events(&self, owner: &str, range: DateRange) -> Result<Vec<FixedEvent>, StoreError>;

    fn insert_events(&self, events: &[FixedEvent]) -> Result<(), StoreError>;
}

pub trait SettingsProvider {
    fn user_settings(&self, owner: &str) -> Result<Option<UserSettings>, StoreError>;
}

pub trait ProjectRegistry {
    fn list_projects(&self, owner: &str) -> Result<Vec<Project>, StoreError>;
}

pub trait BehaviorLog {
    /// Overrun minutes of the `limit` most recent samples, newest first.
    fn recent_overruns(&self, owner: &str, limit: usize) -> Result<Vec<i64>, StoreError>;

    fn record_overrun(&self, sample: &BehavioralSample) -> Result<(), StoreError>;
}

/// Everything the engine needs from its environment.
pub trait Backend: TaskStore + FixedEventStore + SettingsProvider + ProjectRegistry + BehaviorLog {}

impl<T> Backend for T where
    T: TaskStore + FixedEventStore + SettingsProvider + ProjectRegistry + BehaviorLog
{
}
