//! A failing write aborts the rest of a pass and leaves earlier writes.

use std::cell::Cell;

use chrono::{Duration, NaiveDate};
use daywright_core::schedule::clock::parse_date;
use daywright_core::storage::{
    BehaviorLog, DateRange, FixedEventStore, ProjectRegistry, SegmentPatch, SettingsProvider,
    TaskPatch, TaskStore,
};
use daywright_core::{
    BehavioralSample, CoreError, FixedEvent, Project, ScheduleDb, ScheduleEngine, ScheduleRequest,
    StoreError, Task, TaskSegment, UserSettings,
};

/// Delegates to a real store, failing the n-th `update_task` call.
struct FlakyStore {
    inner: ScheduleDb,
    fail_on_update: usize,
    updates: Cell<usize>,
    segment_writes: Cell<usize>,
}

impl FlakyStore {
    fn new(fail_on_update: usize) -> Self {
        Self {
            inner: ScheduleDb::open_memory().unwrap(),
            fail_on_update,
            updates: Cell::new(0),
            segment_writes: Cell::new(0),
        }
    }
}

impl TaskStore for FlakyStore {
    fn list_tasks(&self, owner: &str, range: DateRange) -> Result<Vec<Task>, StoreError> {
        self.inner.list_tasks(owner, range)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        self.inner.get_task(id)
    }

    fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.inner.insert_tasks(tasks)
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError> {
        let n = self.updates.get() + 1;
        self.updates.set(n);
        if n == self.fail_on_update {
            return Err(StoreError::Backend("disk I/O error".into()));
        }
        self.inner.update_task(id, patch)
    }

    fn delete_tasks(&self, ids: &[String]) -> Result<usize, StoreError> {
        self.inner.delete_tasks(ids)
    }

    fn list_segments(&self, owner: &str, range: DateRange) -> Result<Vec<TaskSegment>, StoreError> {
        self.inner.list_segments(owner, range)
    }

    fn get_segment(&self, id: &str) -> Result<Option<TaskSegment>, StoreError> {
        self.inner.get_segment(id)
    }

    fn task_segments(&self, task_id: &str) -> Result<Vec<TaskSegment>, StoreError> {
        self.inner.task_segments(task_id)
    }

    fn replace_segments(&self, task_id: &str, segments: &[TaskSegment]) -> Result<(), StoreError> {
        self.segment_writes.set(self.segment_writes.get() + 1);
        self.inner.replace_segments(task_id, segments)
    }

    fn update_segment(&self, id: &str, patch: &SegmentPatch) -> Result<(), StoreError> {
        self.inner.update_segment(id, patch)
    }

    fn clear_segments(&self, owner: &str) -> Result<usize, StoreError> {
        self.inner.clear_segments(owner)
    }
}

impl FixedEventStore for FlakyStore {
    fn list_events(&self, owner: &str, range: DateRange) -> Result<Vec<FixedEvent>, StoreError> {
        self.inner.list_events(owner, range)
    }

    fn insert_events(&self, events: &[FixedEvent]) -> Result<(), StoreError> {
        self.inner.insert_events(events)
    }
}

impl SettingsProvider for FlakyStore {
    fn user_settings(&self, owner: &str) -> Result<Option<UserSettings>, StoreError> {
        self.inner.user_settings(owner)
    }
}

impl ProjectRegistry for FlakyStore {
    fn list_projects(&self, owner: &str) -> Result<Vec<Project>, StoreError> {
        self.inner.list_projects(owner)
    }
}

impl BehaviorLog for FlakyStore {
    fn recent_overruns(&self, owner: &str, limit: usize) -> Result<Vec<i64>, StoreError> {
        self.inner.recent_overruns(owner, limit)
    }

    fn record_overrun(&self, sample: &BehavioralSample) -> Result<(), StoreError> {
        self.inner.record_overrun(sample)
    }
}

fn monday() -> NaiveDate {
    parse_date("2026-10-19").unwrap()
}

fn three_tasks() -> Vec<Task> {
    let base = monday().and_hms_opt(7, 0, 0).unwrap();
    (0..3)
        .map(|i| {
            let mut task = Task::new("alice", format!("task {i}"), monday()).with_estimate(1.0);
            task.created_at = base + Duration::minutes(i);
            task
        })
        .collect()
}

#[test]
fn second_update_failure_keeps_first_write() {
    let store = FlakyStore::new(2);
    let tasks = three_tasks();
    store.insert_tasks(&tasks).unwrap();

    let err = ScheduleEngine::new(&store)
        .schedule(&ScheduleRequest::new("alice", monday()))
        .unwrap_err();

    assert!(matches!(err, CoreError::Store(StoreError::Backend(_))));
    assert_eq!(err.to_string(), "Store error: disk I/O error");
    assert_eq!(store.updates.get(), 2);
    assert_eq!(store.segment_writes.get(), 0);

    let first = store.get_task(&tasks[0].id).unwrap().unwrap();
    assert!(first.is_time_boxed());
    for task in &tasks[1..] {
        assert!(!store.get_task(&task.id).unwrap().unwrap().is_time_boxed());
    }
}

#[test]
fn first_update_failure_writes_nothing() {
    let store = FlakyStore::new(1);
    let tasks = three_tasks();
    store.insert_tasks(&tasks).unwrap();

    assert!(ScheduleEngine::new(&store)
        .schedule(&ScheduleRequest::new("alice", monday()))
        .is_err());
    let listed = store.list_tasks("alice", DateRange::all()).unwrap();
    assert!(listed.iter().all(|t| !t.is_time_boxed()));
}

#[test]
fn failed_completion_records_no_sample() {
    let store = FlakyStore::new(1);
    let task = Task::new("alice", "timed", monday()).with_time(
        chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );
    store.insert_tasks(&[task.clone()]).unwrap();

    let now = monday().and_hms_opt(10, 30, 0).unwrap();
    assert!(ScheduleEngine::new(&store).complete_task(&task.id, now).is_err());
    assert!(store.recent_overruns("alice", 20).unwrap().is_empty());
}
