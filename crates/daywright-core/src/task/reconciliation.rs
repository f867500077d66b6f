//! Overrun detection for the "today" refresh.
//!
//! When the chunk being worked on runs past its planned end, the rest of
//! the day is out of date. The running chunk is either a task's own range
//! or one of its segments. Two remedies exist:
//!
//! - without fixed events, [`plan_shift`] pushes the downstream work of the
//!   day forward by the overrun;
//! - with fixed events, [`plan_delegation`] frees the displaced tasks so a
//!   full allocator pass can fit them around the events.
//!
//! Both functions only plan; the engine applies the result to the store.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Task, TaskSegment, TaskStatus};
use crate::schedule::clock::{minutes_of_day, time_from_minutes};

/// An in-progress chunk that has run past its planned end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrun {
    pub task_id: String,
    /// Set when the running chunk is a segment rather than the task itself
    pub segment_id: Option<String>,
    pub date: NaiveDate,
    /// Planned start of the running chunk
    pub start: NaiveTime,
    /// Planned end, in minutes-of-day
    pub planned_end: i64,
    /// Current time, in minutes-of-day
    pub now: i64,
}

impl Overrun {
    pub fn minutes(&self) -> i64 {
        self.now - self.planned_end
    }
}

/// New time range for one task or segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeShift {
    pub id: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Same-day shift of downstream work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftPlan {
    /// The overrunning chunk, its end moved to now
    pub extended: TimeShift,
    pub tasks: Vec<TimeShift>,
    pub segments: Vec<TimeShift>,
}

/// Preparation for a full allocator pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationPlan {
    pub extended: TimeShift,
    /// Tasks whose times get cleared so the pass places them again
    pub cleared: Vec<String>,
}

/// Find the overrunning chunk of `now`'s date, earliest planned end first.
///
/// A task's own range counts while none of its segments of that day has
/// been started or finished. Returns `None` when no in-progress chunk of
/// that day has a planned end strictly before `now`.
pub fn detect_overrun(
    tasks: &[Task],
    segments: &[TaskSegment],
    now: NaiveDateTime,
) -> Option<Overrun> {
    let today = now.date();
    let now_minutes = minutes_of_day(now.time());
    let finished = finished_ids(tasks);
    let moved_on: HashSet<&str> = segments
        .iter()
        .filter(|s| s.date == today && s.status != TaskStatus::Planned)
        .map(|s| s.task_id.as_str())
        .collect();

    let own_chunks = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress && t.date == today)
        .filter(|t| !moved_on.contains(t.id.as_str()))
        .filter_map(|t| t.time_range().map(|range| (t.id.as_str(), None, range)));
    let segment_chunks = segments
        .iter()
        .filter(|s| s.status == TaskStatus::InProgress && s.date == today)
        .filter(|s| !finished.contains(s.task_id.as_str()))
        .map(|s| (s.task_id.as_str(), Some(s.id.as_str()), s.time_range()));

    own_chunks
        .chain(segment_chunks)
        .filter(|(_, _, (_, end))| *end < now_minutes)
        .min_by_key(|(_, _, (_, end))| *end)
        .map(|(task_id, segment_id, (start, end))| Overrun {
            task_id: task_id.to_string(),
            segment_id: segment_id.map(str::to_string),
            date: today,
            start: time_from_minutes(start),
            planned_end: end,
            now: now_minutes,
        })
}

/// Ids of completed tasks; their leftover segments are never moved.
fn finished_ids(tasks: &[Task]) -> HashSet<&str> {
    tasks
        .iter()
        .filter(|t| t.is_completed())
        .map(|t| t.id.as_str())
        .collect()
}

fn extended(overrun: &Overrun) -> TimeShift {
    TimeShift {
        id: overrun
            .segment_id
            .clone()
            .unwrap_or_else(|| overrun.task_id.clone()),
        start: overrun.start,
        end: time_from_minutes(overrun.now),
    }
}

fn shift_range((start, end): (i64, i64), by: i64) -> (NaiveTime, NaiveTime) {
    (time_from_minutes(start + by), time_from_minutes(end + by))
}

/// Shift every unfinished time-boxed task and segment of the day that
/// starts at or after the original planned end.
pub fn plan_shift(overrun: &Overrun, tasks: &[Task], segments: &[TaskSegment]) -> ShiftPlan {
    let by = overrun.minutes();

    let shifted_tasks = tasks
        .iter()
        .filter(|t| t.id != overrun.task_id && t.date == overrun.date && !t.is_completed())
        .filter_map(|t| t.time_range().map(|range| (t, range)))
        .filter(|(_, (start, _))| *start >= overrun.planned_end)
        .map(|(t, range)| {
            let (start, end) = shift_range(range, by);
            TimeShift {
                id: t.id.clone(),
                start,
                end,
            }
        })
        .collect();

    let finished = finished_ids(tasks);
    let shifted_segments = segments
        .iter()
        .filter(|s| s.date == overrun.date && !s.is_completed())
        .filter(|s| !finished.contains(s.task_id.as_str()))
        .filter(|s| overrun.segment_id.as_deref() != Some(s.id.as_str()))
        .filter(|s| s.time_range().0 >= overrun.planned_end)
        .map(|s| {
            let (start, end) = shift_range(s.time_range(), by);
            TimeShift {
                id: s.id.clone(),
                start,
                end,
            }
        })
        .collect();

    ShiftPlan {
        extended: extended(overrun),
        tasks: shifted_tasks,
        segments: shifted_segments,
    }
}

/// Pick the planned tasks displaced by the overrun.
///
/// Only tasks with a usable estimate are cleared; anything else keeps its
/// times since no pass could place it again.
pub fn plan_delegation(overrun: &Overrun, tasks: &[Task]) -> DelegationPlan {
    let cleared = tasks
        .iter()
        .filter(|t| {
            t.id != overrun.task_id && t.date == overrun.date && t.status == TaskStatus::Planned
        })
        .filter(|t| t.estimated_minutes().is_some())
        .filter(|t| {
            t.time_range()
                .is_some_and(|(start, _)| start >= overrun.planned_end)
        })
        .map(|t| t.id.clone())
        .collect();

    DelegationPlan {
        extended: extended(overrun),
        cleared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::clock::{format_time, parse_date, parse_time_of_day};

    fn t(s: &str) -> NaiveTime {
        parse_time_of_day(s).unwrap()
    }

    fn today() -> NaiveDate {
        parse_date("2026-10-16").unwrap()
    }

    fn timed(title: &str, start: &str, end: &str) -> Task {
        Task::new("u", title, today()).with_time(t(start), t(end))
    }

    fn running(start: &str, end: &str) -> Task {
        let mut task = timed("running", start, end);
        task.status = TaskStatus::InProgress;
        task
    }

    #[test]
    fn no_overrun_before_planned_end() {
        let tasks = vec![running("09:00", "10:00")];
        assert!(detect_overrun(&tasks, &[], today().and_time(t("10:00"))).is_none());
        assert!(detect_overrun(&tasks, &[], today().and_time(t("09:45"))).is_none());
    }

    #[test]
    fn earliest_planned_end_wins() {
        let early = running("09:00", "10:00");
        let late = running("09:00", "11:00");
        let overrun = detect_overrun(&[late, early.clone()], &[], today().and_time(t("11:30"))).unwrap();
        assert_eq!(overrun.task_id, early.id);
        assert_eq!(overrun.minutes(), 90);
    }

    #[test]
    fn other_days_are_ignored() {
        let mut yesterday = running("09:00", "10:00");
        yesterday.date = parse_date("2026-10-15").unwrap();
        assert!(detect_overrun(&[yesterday], &[], today().and_time(t("12:00"))).is_none());
    }

    #[test]
    fn shift_preserves_duration_and_skips_earlier_work() {
        let run = running("09:00", "10:00");
        let before = timed("before", "08:00", "08:30");
        let after = timed("after", "10:00", "11:00");
        let mut done = timed("done", "11:00", "12:00");
        done.status = TaskStatus::Completed;
        let tasks = vec![run.clone(), before, after.clone(), done];

        let overrun = detect_overrun(&tasks, &[], today().and_time(t("10:20"))).unwrap();
        let plan = plan_shift(&overrun, &tasks, &[]);

        assert_eq!(plan.extended.id, run.id);
        assert_eq!(format_time(plan.extended.end), "10:20");
        assert_eq!(
            plan.tasks,
            vec![TimeShift {
                id: after.id,
                start: t("10:20"),
                end: t("11:20"),
            }]
        );
    }

    #[test]
    fn shift_clamps_at_end_of_day() {
        let run = running("09:00", "10:00");
        let late = timed("late", "23:00", "23:50");
        let tasks = vec![run, late];
        let overrun = detect_overrun(&tasks, &[], today().and_time(t("10:30"))).unwrap();
        let plan = plan_shift(&overrun, &tasks, &[]);
        assert_eq!(plan.tasks[0].start, t("23:30"));
        assert_eq!(plan.tasks[0].end, t("23:59"));
    }

    #[test]
    fn shift_moves_segments_too() {
        let run = running("09:00", "10:00");
        let segment = TaskSegment::new("other", "u", 1, today(), t("13:00"), t("14:00"));
        let overrun = detect_overrun(&[run.clone()], &[], today().and_time(t("10:15"))).unwrap();
        let plan = plan_shift(&overrun, &[run], &[segment.clone()]);
        assert_eq!(plan.segments[0].id, segment.id);
        assert_eq!(plan.segments[0].start, t("13:15"));
    }

    #[test]
    fn running_segment_can_overrun() {
        let run = running("09:00", "10:00");
        let mut chunk = TaskSegment::new(run.id.clone(), "u", 1, today(), t("11:00"), t("12:00"));
        chunk.status = TaskStatus::InProgress;
        let later = timed("later", "12:15", "13:00");
        let tasks = vec![run.clone(), later.clone()];

        // The task's own 09:00-10:00 range is behind it once the segment started
        let overrun = detect_overrun(&tasks, &[chunk.clone()], today().and_time(t("12:20"))).unwrap();
        assert_eq!(overrun.task_id, run.id);
        assert_eq!(overrun.segment_id.as_deref(), Some(chunk.id.as_str()));
        assert_eq!(overrun.minutes(), 20);
        assert!(detect_overrun(&tasks, &[chunk.clone()], today().and_time(t("11:30"))).is_none());

        let plan = plan_shift(&overrun, &tasks, &[chunk.clone()]);
        assert_eq!(plan.extended.id, chunk.id);
        assert_eq!(plan.extended.start, t("11:00"));
        assert_eq!(plan.extended.end, t("12:20"));
        assert!(plan.segments.is_empty());
        assert_eq!(plan.tasks[0].id, later.id);
        assert_eq!(plan.tasks[0].start, t("12:35"));
    }

    #[test]
    fn segments_of_completed_tasks_stay_put() {
        let run = running("09:00", "10:00");
        let mut done = timed("done", "08:00", "08:30");
        done.status = TaskStatus::Completed;
        let leftover = TaskSegment::new(done.id.clone(), "u", 1, today(), t("13:00"), t("14:00"));
        let mut stale_run = leftover.clone();
        stale_run.id = "stale".into();
        stale_run.status = TaskStatus::InProgress;
        let tasks = vec![run, done];

        let overrun = detect_overrun(&tasks, &[stale_run], today().and_time(t("14:30"))).unwrap();
        assert!(overrun.segment_id.is_none());
        let plan = plan_shift(&overrun, &tasks, &[leftover]);
        assert!(plan.segments.is_empty());
    }

    #[test]
    fn delegation_clears_planned_downstream_tasks() {
        let run = running("09:00", "10:00");
        let after = timed("after", "10:30", "11:00").with_estimate(0.5);
        let unestimated = timed("unestimated", "11:00", "11:30");
        let earlier = timed("earlier", "08:00", "08:45").with_estimate(0.75);
        let tasks = vec![run.clone(), after.clone(), unestimated, earlier];

        let overrun = detect_overrun(&tasks, &[], today().and_time(t("10:40"))).unwrap();
        let plan = plan_delegation(&overrun, &tasks);
        assert_eq!(plan.cleared, vec![after.id]);
        assert_eq!(plan.extended.start, t("09:00"));
        assert_eq!(plan.extended.end, t("10:40"));
    }
}
