//! Scheduling engine.
//!
//! Runs the planners of this crate against a [`Backend`]: each operation
//! reads what it needs once, plans in memory, then writes in a fixed order.
//! The first failing write aborts the operation; earlier writes stay.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::schedule::{
    ProjectIndex, Task, TaskSegment, TaskStatus, TaskTransitionError, UserSettings,
};
use crate::scheduler::{AutoScheduler, SchedulePlan, SchedulerConfig, SchedulingContext};
use crate::stats::{BehavioralSample, OverrunBias};
use crate::storage::{Backend, DateRange, SegmentPatch, TaskPatch};
use crate::task::carry_over::{plan_roll_forward, RollForwardPlan};
use crate::task::reconciliation::{
    detect_overrun, plan_delegation, plan_shift, DelegationPlan, Overrun, ShiftPlan, TimeShift,
};

/// One scheduling pass request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub owner: String,
    /// Requested first day; weekends roll to Monday
    pub anchor: NaiveDate,
    /// Project key to favour, enabling focus mode
    pub focus_key: Option<String>,
    /// Nothing is placed before this instant
    pub not_before: Option<NaiveDateTime>,
}

impl ScheduleRequest {
    pub fn new(owner: impl Into<String>, anchor: NaiveDate) -> Self {
        Self {
            owner: owner.into(),
            anchor,
            focus_key: None,
            not_before: None,
        }
    }

    pub fn with_focus(mut self, key: Option<String>) -> Self {
        self.focus_key = key;
        self
    }

    pub fn with_not_before(mut self, instant: NaiveDateTime) -> Self {
        self.not_before = Some(instant);
        self
    }
}

/// What a scheduling pass did.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub plan: SchedulePlan,
    pub bias: OverrunBias,
    /// Segments removed before a focus pass
    pub cleared_segments: usize,
}

/// What an overrun check did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Nothing ran past its planned end
    NoOverrun,
    /// Same-day work moved forward by the overrun
    Shifted { overrun: Overrun, plan: ShiftPlan },
    /// Displaced work cleared and handed to a full pass
    Delegated {
        overrun: Overrun,
        plan: DelegationPlan,
        placed: usize,
        unplaced: Vec<String>,
    },
}

impl ReconcileOutcome {
    pub fn overrun(&self) -> Option<&Overrun> {
        match self {
            ReconcileOutcome::NoOverrun => None,
            ReconcileOutcome::Shifted { overrun, .. } | ReconcileOutcome::Delegated { overrun, .. } => {
                Some(overrun)
            }
        }
    }
}

/// Combined result of the "today" refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct TodayRefresh {
    pub rolled: RollForwardPlan,
    pub reconcile: ReconcileOutcome,
}

/// A completed task and the overrun sample it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub task: Task,
    pub sample: Option<BehavioralSample>,
    /// Segments already under way, now marked completed
    pub closed_segments: usize,
    /// Segments that had not started yet and were removed
    pub dropped_segments: usize,
}

/// Engine over a backend borrowed for its lifetime.
pub struct ScheduleEngine<'a, B: Backend + ?Sized> {
    backend: &'a B,
    scheduler: AutoScheduler,
    fallback_settings: UserSettings,
}

impl<'a, B: Backend + ?Sized> ScheduleEngine<'a, B> {
    /// Create an engine with the default scheduler config.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            scheduler: AutoScheduler::new(),
            fallback_settings: UserSettings::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = AutoScheduler::with_config(config);
        self
    }

    /// Settings used when the owner has none stored, or stored ones are invalid.
    pub fn with_fallback_settings(mut self, settings: UserSettings) -> Self {
        if settings.is_valid() {
            self.fallback_settings = settings;
        }
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.scheduler.config()
    }

    /// Read the per-pass context: settings, projects, and overrun bias.
    pub fn build_context(
        &self,
        owner: &str,
        anchor: NaiveDate,
        focus_key: Option<String>,
    ) -> Result<(SchedulingContext, OverrunBias)> {
        let settings = match self.backend.user_settings(owner)? {
            Some(settings) if settings.is_valid() => settings,
            Some(settings) => {
                tracing::warn!(
                    owner,
                    work_start = %settings.work_start,
                    work_end = %settings.work_end,
                    "invalid work window, using defaults"
                );
                self.fallback_settings
            }
            None => self.fallback_settings,
        };
        let projects = ProjectIndex::new(self.backend.list_projects(owner)?);
        let overruns = self
            .backend
            .recent_overruns(owner, self.config().sample_window)?;
        let bias = OverrunBias::from_overruns(&overruns);
        if bias.is_active() {
            tracing::debug!(owner, bias = %bias.describe(), "applying overrun bias");
        }

        let ctx = SchedulingContext::new(owner, anchor)
            .with_focus(focus_key)
            .with_settings(settings)
            .with_projects(projects)
            .with_bias(bias.minutes);
        Ok((ctx, bias))
    }

    /// Run one allocator pass and write its placements.
    ///
    /// Write order: clear segments (focus mode only), then each primary
    /// chunk onto its task, then each placed task's segment list.
    pub fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome> {
        let (mut ctx, bias) =
            self.build_context(&request.owner, request.anchor, request.focus_key.clone())?;
        if let Some(instant) = request.not_before {
            ctx = ctx.with_not_before(instant);
        }

        let range = DateRange::since(request.anchor);
        let tasks = self.backend.list_tasks(&request.owner, range)?;
        let segments = self.backend.list_segments(&request.owner, range)?;
        let events = self.backend.list_events(&request.owner, range)?;

        let plan = self.scheduler.plan(&ctx, &tasks, &segments, &events)?;
        let cleared_segments = self.apply_plan(&request.owner, &plan)?;

        tracing::info!(
            owner = %request.owner,
            anchor = %request.anchor,
            placed = plan.primaries().count(),
            chunks = plan.placements.len(),
            unplaced = plan.unplaced.len(),
            "schedule pass written"
        );
        Ok(ScheduleOutcome {
            plan,
            bias,
            cleared_segments,
        })
    }

    fn apply_plan(&self, owner: &str, plan: &SchedulePlan) -> Result<usize, StoreError> {
        let cleared = if plan.clears_segments {
            self.backend.clear_segments(owner)?
        } else {
            0
        };
        for primary in plan.primaries() {
            self.backend.update_task(
                &primary.task_id,
                &TaskPatch::placement(primary.date, primary.start, primary.end),
            )?;
        }
        for (task_id, segments) in plan.segments_by_task() {
            self.backend.replace_segments(&task_id, &segments)?;
        }
        Ok(cleared)
    }

    /// Move unfinished work dated before `today` to the next workday.
    pub fn roll_forward(&self, owner: &str, today: NaiveDate) -> Result<RollForwardPlan> {
        let range = DateRange::until(today);
        let tasks = self.backend.list_tasks(owner, range)?;
        let segments = self.backend.list_segments(owner, range)?;

        let plan = plan_roll_forward(&tasks, &segments, today);
        for moved in &plan.tasks {
            self.backend.update_task(&moved.id, &TaskPatch::date(moved.to))?;
        }
        for moved in &plan.segments {
            self.backend
                .update_segment(&moved.id, &SegmentPatch::date(moved.to))?;
        }

        if !plan.is_empty() {
            tracing::info!(owner, %today, moved = plan.len(), "rolled stale work forward");
        }
        Ok(plan)
    }

    /// Correct today's plan when the running chunk runs late.
    ///
    /// With fixed events on the day, the displaced tasks are cleared and a
    /// full pass places them after `now`. Otherwise the rest of the day
    /// shifts forward by the overrun.
    pub fn reconcile_overrun(&self, owner: &str, now: NaiveDateTime) -> Result<ReconcileOutcome> {
        let today = DateRange::day(now.date());
        let tasks = self.backend.list_tasks(owner, today)?;
        let segments = self.backend.list_segments(owner, today)?;
        let Some(overrun) = detect_overrun(&tasks, &segments, now) else {
            return Ok(ReconcileOutcome::NoOverrun);
        };

        let events = self.backend.list_events(owner, today)?;
        if events.is_empty() {
            let plan = plan_shift(&overrun, &tasks, &segments);

            self.extend(&overrun, &plan.extended)?;
            for shift in &plan.tasks {
                self.backend
                    .update_task(&shift.id, &TaskPatch::times(shift.start, shift.end))?;
            }
            for shift in &plan.segments {
                self.backend
                    .update_segment(&shift.id, &SegmentPatch::times(shift.start, shift.end))?;
            }

            tracing::info!(
                owner,
                task = %overrun.task_id,
                segment = ?overrun.segment_id,
                minutes = overrun.minutes(),
                shifted = plan.tasks.len() + plan.segments.len(),
                "shifted today's work after overrun"
            );
            return Ok(ReconcileOutcome::Shifted { overrun, plan });
        }

        let plan = plan_delegation(&overrun, &tasks);
        self.extend(&overrun, &plan.extended)?;
        for id in &plan.cleared {
            self.backend.update_task(id, &TaskPatch::clear_times())?;
        }

        let request = ScheduleRequest::new(owner, overrun.date).with_not_before(now);
        let outcome = self.schedule(&request)?;

        tracing::info!(
            owner,
            task = %overrun.task_id,
            segment = ?overrun.segment_id,
            minutes = overrun.minutes(),
            cleared = plan.cleared.len(),
            "delegated overrun to a scheduling pass"
        );
        Ok(ReconcileOutcome::Delegated {
            overrun,
            plan,
            placed: outcome.plan.primaries().count(),
            unplaced: outcome.plan.unplaced,
        })
    }

    /// Write the new end of the overrunning chunk.
    fn extend(&self, overrun: &Overrun, shift: &TimeShift) -> Result<(), StoreError> {
        match &overrun.segment_id {
            Some(id) => self
                .backend
                .update_segment(id, &SegmentPatch::times(shift.start, shift.end)),
            None => self
                .backend
                .update_task(&overrun.task_id, &TaskPatch::times(shift.start, shift.end)),
        }
    }

    /// Roll stale work forward, then reconcile any overrun.
    pub fn refresh_today(&self, owner: &str, now: NaiveDateTime) -> Result<TodayRefresh> {
        let rolled = self.roll_forward(owner, now.date())?;
        let reconcile = self.reconcile_overrun(owner, now)?;
        Ok(TodayRefresh { rolled, reconcile })
    }

    fn load_task(&self, id: &str) -> Result<Task> {
        let task = self.backend.get_task(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "task",
            id: id.to_string(),
        })?;
        Ok(task)
    }

    /// Mark a task in progress.
    pub fn start_task(&self, id: &str, now: NaiveDateTime) -> Result<Task> {
        let mut task = self.load_task(id)?;
        task.transition_to(TaskStatus::InProgress, now)?;
        self.backend.update_task(id, &TaskPatch::lifecycle(&task))?;
        tracing::info!(task = %id, "task started");
        Ok(task)
    }

    /// Mark a task completed and record how far it overran its plan.
    ///
    /// Segments already under way at `now` are marked completed; those not
    /// started yet are removed. The planned finish is the end of the last
    /// chunk as it stood before completion.
    pub fn complete_task(&self, id: &str, now: NaiveDateTime) -> Result<Completion> {
        let mut task = self.load_task(id)?;
        task.transition_to(TaskStatus::Completed, now)?;
        let segments = self.backend.task_segments(id)?;
        self.backend.update_task(id, &TaskPatch::lifecycle(&task))?;

        let (closed, dropped): (Vec<TaskSegment>, Vec<TaskSegment>) = segments
            .iter()
            .cloned()
            .partition(|s| s.is_completed() || s.starts_at() < now);
        let closed_segments = closed.iter().filter(|s| !s.is_completed()).count();
        if closed_segments > 0 || !dropped.is_empty() {
            let kept: Vec<TaskSegment> = closed
                .into_iter()
                .map(|mut s| {
                    s.status = TaskStatus::Completed;
                    s
                })
                .collect();
            self.backend.replace_segments(id, &kept)?;
        }

        let sample = BehavioralSample::from_completion(&task, &segments, now);
        if let Some(sample) = &sample {
            self.backend.record_overrun(sample)?;
            tracing::debug!(task = %id, overrun = sample.overrun_minutes, "recorded overrun sample");
        }
        tracing::info!(
            task = %id,
            closed_segments,
            dropped_segments = dropped.len(),
            "task completed"
        );
        Ok(Completion {
            task,
            sample,
            closed_segments,
            dropped_segments: dropped.len(),
        })
    }

    fn load_segment(&self, id: &str) -> Result<TaskSegment> {
        let segment = self.backend.get_segment(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "segment",
            id: id.to_string(),
        })?;
        Ok(segment)
    }

    /// Mark a continuation segment in progress.
    ///
    /// A parent task still planned is started along with it.
    pub fn start_segment(&self, id: &str, now: NaiveDateTime) -> Result<TaskSegment> {
        let mut segment = self.load_segment(id)?;
        let mut parent = self.load_task(&segment.task_id)?;
        segment.transition_to(TaskStatus::InProgress)?;
        let start_parent = parent.status == TaskStatus::Planned;
        if start_parent {
            parent.transition_to(TaskStatus::InProgress, now)?;
        } else if parent.is_completed() {
            return Err(TaskTransitionError {
                task_id: parent.id,
                from: TaskStatus::Completed,
                to: TaskStatus::InProgress,
            }
            .into());
        }

        if start_parent {
            self.backend
                .update_task(&parent.id, &TaskPatch::lifecycle(&parent))?;
        }
        self.backend
            .update_segment(id, &SegmentPatch::status(TaskStatus::InProgress))?;
        tracing::info!(segment = %id, task = %segment.task_id, "segment started");
        Ok(segment)
    }

    /// Mark a continuation segment completed. The task itself stays open.
    pub fn complete_segment(&self, id: &str) -> Result<TaskSegment> {
        let mut segment = self.load_segment(id)?;
        segment.transition_to(TaskStatus::Completed)?;
        self.backend
            .update_segment(id, &SegmentPatch::status(TaskStatus::Completed))?;
        tracing::info!(segment = %id, task = %segment.task_id, "segment completed");
        Ok(segment)
    }
}
