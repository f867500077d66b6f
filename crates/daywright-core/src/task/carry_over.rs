//! Roll-forward of stale, unfinished work.
//!
//! Before any day is loaded, tasks and continuation segments dated before
//! today that are not completed move to the first workday at or after
//! today. Segments of a completed task stay where they are. Time-of-day
//! fields are left alone.
//!
//! # Usage
//! ```rust,ignore
//! use daywright_core::task::carry_over::plan_roll_forward;
//!
//! let plan = plan_roll_forward(&tasks, &segments, today);
//! for moved in &plan.tasks {
//!     store.update_task(&moved.id, &TaskPatch::date(moved.to))?;
//! }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Task, TaskSegment};
use crate::schedule::clock::next_workday;

/// One record whose date changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMove {
    pub id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Date rewrites for tasks and segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollForwardPlan {
    pub tasks: Vec<DateMove>,
    pub segments: Vec<DateMove>,
}

impl RollForwardPlan {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len() + self.segments.len()
    }
}

/// Plan the roll-forward of everything stale relative to `today`.
pub fn plan_roll_forward(
    tasks: &[Task],
    segments: &[TaskSegment],
    today: NaiveDate,
) -> RollForwardPlan {
    let target = next_workday(today);

    let moved_tasks: Vec<DateMove> = tasks
        .iter()
        .filter(|t| t.date < today && !t.is_completed())
        .map(|t| DateMove {
            id: t.id.clone(),
            from: t.date,
            to: target,
        })
        .collect();

    let finished: HashSet<&str> = tasks
        .iter()
        .filter(|t| t.is_completed())
        .map(|t| t.id.as_str())
        .collect();
    let segments = segments
        .iter()
        .filter(|s| s.date < today && !s.is_completed())
        .filter(|s| !finished.contains(s.task_id.as_str()))
        .map(|s| DateMove {
            id: s.id.clone(),
            from: s.date,
            to: target,
        })
        .collect();

    RollForwardPlan {
        tasks: moved_tasks,
        segments,
    }
}
