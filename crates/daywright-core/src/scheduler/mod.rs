//! Chunk allocator.
//!
//! Places estimated, un-timed tasks into free time on upcoming workdays:
//! - Orders candidates with the dependency resolver
//! - Splits work into chunks capped per mode, one per slot visit
//! - Keeps the first chunk on the task, later chunks as [`TaskSegment`]s
//! - Biases toward a focus project with a configurable burst ratio
//!
//! The allocator only plans. Writing the plan is the engine's job.

mod lanes;
pub mod queue;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SchedulingError;
use crate::schedule::clock::{next_workday, time_from_minutes};
use crate::schedule::{FixedEvent, ProjectIndex, Task, TaskSegment, UserSettings};
use crate::timeline::BusyMap;

pub use lanes::{Lane, LaneEntry, LaneQueues};
pub use queue::{resolve_order, DependencyReport, ResolvedQueue};

/// Upper bound accepted for `horizon_days`.
pub const MAX_HORIZON_DAYS: i64 = 3650;

/// What to do when the candidates' dependencies contain a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Schedule anyway in sorted order and log a warning
    #[default]
    FailOpen,
    /// Refuse the pass
    Reject,
}

impl CyclePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePolicy::FailOpen => "fail_open",
            CyclePolicy::Reject => "reject",
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Chunk cap outside focus mode (minutes)
    #[serde(default = "default_chunk_minutes")]
    pub chunk_minutes: i64,
    /// Chunk cap in focus mode (minutes)
    #[serde(default = "default_focus_chunk_minutes")]
    pub focus_chunk_minutes: i64,
    /// Consecutive focus-lane picks before the normal lane gets a turn
    #[serde(default = "default_focus_burst")]
    pub focus_burst: u32,
    /// Consecutive normal-lane picks before focus resumes
    #[serde(default = "default_normal_burst")]
    pub normal_burst: u32,
    /// Days past the anchor after which a pass gives up
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
    /// Number of recent overrun samples averaged into the bias
    #[serde(default = "default_sample_window")]
    pub sample_window: usize,
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
}

fn default_chunk_minutes() -> i64 {
    90
}
fn default_focus_chunk_minutes() -> i64 {
    120
}
fn default_focus_burst() -> u32 {
    2
}
fn default_normal_burst() -> u32 {
    1
}
fn default_horizon_days() -> i64 {
    365
}
fn default_sample_window() -> usize {
    20
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            chunk_minutes: default_chunk_minutes(),
            focus_chunk_minutes: default_focus_chunk_minutes(),
            focus_burst: default_focus_burst(),
            normal_burst: default_normal_burst(),
            horizon_days: default_horizon_days(),
            sample_window: default_sample_window(),
            cycle_policy: CyclePolicy::default(),
        }
    }
}

/// Per-pass inputs read once before planning.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    pub owner: String,
    /// First day to consider; weekends roll to Monday
    pub anchor: NaiveDate,
    /// Active focus project key, if any
    pub focus_key: Option<String>,
    pub settings: UserSettings,
    pub projects: ProjectIndex,
    /// Minutes added to every estimate
    pub bias_minutes: f64,
    /// Nothing is placed before this instant
    pub not_before: Option<NaiveDateTime>,
}

impl SchedulingContext {
    pub fn new(owner: impl Into<String>, anchor: NaiveDate) -> Self {
        Self {
            owner: owner.into(),
            anchor,
            focus_key: None,
            settings: UserSettings::default(),
            projects: ProjectIndex::default(),
            bias_minutes: 0.0,
            not_before: None,
        }
    }

    pub fn with_focus(mut self, key: Option<String>) -> Self {
        self.focus_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_settings(mut self, settings: UserSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_projects(mut self, projects: ProjectIndex) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_bias(mut self, minutes: f64) -> Self {
        self.bias_minutes = if minutes.is_finite() { minutes.max(0.0) } else { 0.0 };
        self
    }

    pub fn with_not_before(mut self, instant: NaiveDateTime) -> Self {
        self.not_before = Some(instant);
        self
    }

    pub fn is_focus_mode(&self) -> bool {
        self.focus_key.is_some()
    }

    /// Whether a pass in this context may move `task`.
    pub fn is_schedulable(&self, task: &Task) -> bool {
        task.estimated_minutes().is_some()
            && !task.is_completed()
            && (self.is_focus_mode() || !task.is_time_boxed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    /// Rewrites the task's own date and times
    Primary,
    /// Becomes a segment of the task
    Continuation,
}

/// One chunk of work placed on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub task_id: String,
    pub owner: String,
    pub kind: PlacementKind,
    /// 0 for the primary chunk, then 1, 2, ... for continuations
    pub order: u32,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Placement {
    pub fn to_segment(&self) -> TaskSegment {
        TaskSegment::new(
            self.task_id.clone(),
            self.owner.clone(),
            self.order,
            self.date,
            self.start,
            self.end,
        )
    }
}

/// Result of one allocator pass.
#[derive(Debug, Clone, Default)]
pub struct SchedulePlan {
    /// Chunks in placement order
    pub placements: Vec<Placement>,
    /// Tasks still (partly) unplaced when the horizon ran out
    pub unplaced: Vec<String>,
    pub report: DependencyReport,
    /// Some candidates were queued without their dependencies satisfied
    pub fell_back: bool,
    /// Whether the pass replaces every continuation segment of the owner
    pub clears_segments: bool,
}

impl SchedulePlan {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn primaries(&self) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(|p| p.kind == PlacementKind::Primary)
    }

    /// Continuation segments grouped by task, in primary placement order.
    ///
    /// Every placed task appears, with an empty list when it fits in one
    /// chunk, so stale segments from an earlier pass get replaced.
    pub fn segments_by_task(&self) -> Vec<(String, Vec<TaskSegment>)> {
        self.primaries()
            .map(|primary| {
                let segments = self
                    .placements
                    .iter()
                    .filter(|p| p.kind == PlacementKind::Continuation && p.task_id == primary.task_id)
                    .map(Placement::to_segment)
                    .collect();
                (primary.task_id.clone(), segments)
            })
            .collect()
    }
}

/// Automatic scheduler for estimated tasks
pub struct AutoScheduler {
    config: SchedulerConfig,
}

impl AutoScheduler {
    /// Create a new scheduler with default config
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Plan one pass.
    ///
    /// # Arguments
    /// * `ctx` - Owner, anchor date, focus key, work window and bias
    /// * `tasks` - The owner's tasks from the anchor onward
    /// * `segments` - Existing continuation segments in the same range
    /// * `events` - Fixed events in the same range
    ///
    /// # Returns
    /// The placements to write, or an error when the cycle policy rejects
    /// the candidate set.
    pub fn plan(
        &self,
        ctx: &SchedulingContext,
        tasks: &[Task],
        segments: &[TaskSegment],
        events: &[FixedEvent],
    ) -> Result<SchedulePlan, SchedulingError> {
        let focus_mode = ctx.is_focus_mode();
        let candidates: Vec<Task> = tasks
            .iter()
            .filter(|t| ctx.is_schedulable(t))
            .cloned()
            .collect();

        let mut plan = SchedulePlan {
            clears_segments: focus_mode,
            ..SchedulePlan::default()
        };
        if candidates.is_empty() {
            return Ok(plan);
        }

        let candidate_ids: HashSet<&str> = candidates.iter().map(|t| t.id.as_str()).collect();
        let busy = self.busy_map(ctx, tasks, segments, events, &candidate_ids);

        let resolved = resolve_order(candidates, &ctx.projects);
        if resolved.report.has_cycle() {
            match self.config.cycle_policy {
                CyclePolicy::Reject => {
                    return Err(SchedulingError::DependencyCycle {
                        cyclic: resolved.report.cyclic,
                        blocked: resolved.report.blocked,
                    });
                }
                CyclePolicy::FailOpen => {
                    tracing::warn!(
                        cyclic = ?resolved.report.cyclic,
                        blocked = ?resolved.report.blocked,
                        "dependency cycle, scheduling in priority order"
                    );
                }
            }
        }
        plan.report = resolved.report;
        plan.fell_back = resolved.fell_back;

        let mut queues = LaneQueues::new(self.config.focus_burst, self.config.normal_burst);
        for task in resolved.tasks {
            let lane = match &ctx.focus_key {
                Some(key) if ctx.projects.project_key(&task) == *key => Lane::Focus,
                _ => Lane::Normal,
            };
            let minutes = task.estimated_minutes().unwrap_or(0.0) + ctx.bias_minutes;
            queues.push(LaneEntry::new(task, lane, minutes.ceil() as i64));
        }

        self.allocate(ctx, &busy, &mut queues, &mut plan);

        tracing::info!(
            owner = %ctx.owner,
            chunks = plan.placements.len(),
            unplaced = plan.unplaced.len(),
            focus = focus_mode,
            "schedule pass planned"
        );
        Ok(plan)
    }

    fn busy_map(
        &self,
        ctx: &SchedulingContext,
        tasks: &[Task],
        segments: &[TaskSegment],
        events: &[FixedEvent],
        candidate_ids: &HashSet<&str>,
    ) -> BusyMap {
        let mut busy = BusyMap::new();
        for task in tasks.iter().filter(|t| !candidate_ids.contains(t.id.as_str())) {
            busy.add_task(task);
        }
        if !ctx.is_focus_mode() {
            let finished: HashSet<&str> = tasks
                .iter()
                .filter(|t| t.is_completed())
                .map(|t| t.id.as_str())
                .collect();
            for segment in segments.iter().filter(|s| {
                let id = s.task_id.as_str();
                !candidate_ids.contains(id) && !finished.contains(id)
            }) {
                busy.add_segment(segment);
            }
        }
        let break_minutes = i64::from(ctx.settings.break_minutes);
        for event in events {
            busy.add_event(event, break_minutes);
        }
        if let Some(instant) = ctx.not_before {
            busy.block_before(instant);
        }
        busy
    }

    fn allocate(
        &self,
        ctx: &SchedulingContext,
        busy: &BusyMap,
        queues: &mut LaneQueues,
        plan: &mut SchedulePlan,
    ) {
        let (work_start, work_end) = ctx.settings.window();
        let break_minutes = i64::from(ctx.settings.break_minutes);
        let cap = if ctx.is_focus_mode() {
            self.config.focus_chunk_minutes
        } else {
            self.config.chunk_minutes
        }
        .max(1);
        let last_day = ctx.anchor + Duration::days(self.config.horizon_days.clamp(0, MAX_HORIZON_DAYS));

        let mut day = ctx.anchor;
        while !queues.is_empty() {
            day = next_workday(day);
            if day > last_day {
                plan.unplaced = queues.drain().map(|e| e.task.id).collect();
                tracing::warn!(
                    owner = %ctx.owner,
                    unplaced = plan.unplaced.len(),
                    horizon_days = self.config.horizon_days,
                    "scheduling horizon exhausted"
                );
                break;
            }

            for slot in busy.free_slots(day, work_start, work_end) {
                let mut cursor = slot.start;
                while cursor < slot.end {
                    let Some(mut entry) = queues.pop() else {
                        break;
                    };
                    let chunk = entry.remaining.min(cap).min(slot.end - cursor);
                    let end = cursor + chunk;
                    let kind = if entry.is_first_chunk() {
                        PlacementKind::Primary
                    } else {
                        PlacementKind::Continuation
                    };
                    tracing::debug!(
                        task = %entry.task.id,
                        %day,
                        start = cursor,
                        end,
                        ?kind,
                        "placed chunk"
                    );
                    plan.placements.push(Placement {
                        task_id: entry.task.id.clone(),
                        owner: entry.task.owner.clone(),
                        kind,
                        order: entry.placed,
                        date: day,
                        start: time_from_minutes(cursor),
                        end: time_from_minutes(end),
                    });

                    entry.remaining -= chunk;
                    entry.placed += 1;
                    cursor = if end + break_minutes <= slot.end {
                        end + break_minutes
                    } else {
                        slot.end
                    };
                    if entry.remaining > 0 {
                        queues.push(entry);
                    }
                }
            }

            day += Duration::days(1);
        }
    }
}

impl Default for AutoScheduler {
    fn default() -> Self {
        Self::new()
    }
}
