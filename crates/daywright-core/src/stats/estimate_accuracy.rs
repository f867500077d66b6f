//! Behavioral overrun tracking.
//!
//! Each completion records how far past its planned end a task finished.
//! The average of the most recent samples is added to every estimate of
//! the next scheduling pass.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::schedule::{Task, TaskSegment};

/// Minutes a completion ran past its planned end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehavioralSample {
    pub id: String,
    pub owner: String,
    pub task_id: String,
    /// Never negative; finishing early counts as zero
    pub overrun_minutes: i64,
    pub recorded_at: NaiveDateTime,
}

impl BehavioralSample {
    pub fn new(
        owner: impl Into<String>,
        task_id: impl Into<String>,
        overrun_minutes: i64,
        recorded_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.into(),
            task_id: task_id.into(),
            overrun_minutes: overrun_minutes.max(0),
            recorded_at,
        }
    }

    /// Sample for a task completed at `now`, when it had a planned end.
    ///
    /// `segments` are the task's continuation chunks as planned; the last
    /// chunk to end sets the planned finish.
    pub fn from_completion(
        task: &Task,
        segments: &[TaskSegment],
        now: NaiveDateTime,
    ) -> Option<Self> {
        let planned_end = planned_finish(task, segments)?;
        let overrun = overrun_minutes(planned_end, now);
        Some(Self::new(task.owner.clone(), task.id.clone(), overrun, now))
    }
}

/// Latest planned end across a task's own range and its segments.
pub fn planned_finish(task: &Task, segments: &[TaskSegment]) -> Option<NaiveDateTime> {
    let own = task.end_time.map(|end| task.date.and_time(end));
    segments
        .iter()
        .filter(|s| s.task_id == task.id)
        .map(|s| s.date.and_time(s.end_time))
        .chain(own)
        .max()
}

/// Whole minutes from `planned_end` to `actual_end`, floored at zero.
pub fn overrun_minutes(planned_end: NaiveDateTime, actual_end: NaiveDateTime) -> i64 {
    (actual_end - planned_end).num_minutes().max(0)
}

/// Estimate correction derived from recent samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrunBias {
    /// Minutes added to each estimate
    pub minutes: f64,
    /// Number of samples behind the average
    pub sample_count: usize,
}

impl OverrunBias {
    pub fn none() -> Self {
        Self {
            minutes: 0.0,
            sample_count: 0,
        }
    }

    /// Average of the given overruns; no samples means no bias.
    pub fn from_overruns(overruns: &[i64]) -> Self {
        if overruns.is_empty() {
            return Self::none();
        }
        let total: i64 = overruns.iter().map(|m| (*m).max(0)).sum();
        Self {
            minutes: total as f64 / overruns.len() as f64,
            sample_count: overruns.len(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.minutes > 0.0
    }

    /// Human-readable summary for CLI output.
    pub fn describe(&self) -> String {
        if self.sample_count == 0 {
            "no completion history".to_string()
        } else if !self.is_active() {
            format!("on time across {} completions", self.sample_count)
        } else {
            format!(
                "+{:.1} min per task (last {} completions)",
                self.minutes, self.sample_count
            )
        }
    }
}

impl Default for OverrunBias {
    fn default() -> Self {
        Self::none()
    }
}
