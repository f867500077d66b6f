//! # Daywright Core Library
//!
//! This library provides the scheduling engine behind Daywright: it places
//! estimated, un-timed tasks into the free time of a workday calendar that
//! already holds fixed commitments. All operations are available through
//! the `daywright` CLI binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timeline**: busy intervals and free-slot detection inside the work window
//! - **Scheduler**: dependency-aware ordering, focus-biased lanes, and the
//!   chunk allocator that splits long tasks into continuation segments
//! - **Task**: the task model, stale-work roll-forward and overrun reconciliation
//! - **Stats**: behavioral overrun bias and per-project workload
//! - **Storage**: collaborator traits, the SQLite-backed [`ScheduleDb`], and
//!   TOML-based configuration
//! - **Engine**: runs the planners against a storage backend
//!
//! ## Key Components
//!
//! - [`ScheduleEngine`]: schedule passes, "today" refresh, task lifecycle
//! - [`AutoScheduler`]: pure planner behind a scheduling pass
//! - [`ScheduleDb`]: persistence for tasks, segments, events and samples
//! - [`Config`]: application configuration management

pub mod engine;
pub mod error;
pub mod schedule;
pub mod scheduler;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timeline;

pub use engine::{
    Completion, ReconcileOutcome, ScheduleEngine, ScheduleOutcome, ScheduleRequest, TodayRefresh,
};
pub use error::{
    ConfigError, CoreError, Result, SchedulingError, StoreError, ValidationError,
};
pub use schedule::{
    Deadline, DeadlineKind, FixedEvent, Project, ProjectIndex, Task, TaskSegment, TaskStatus,
    UserSettings,
};
pub use scheduler::{
    AutoScheduler, CyclePolicy, DependencyReport, Placement, PlacementKind, SchedulePlan,
    SchedulerConfig, SchedulingContext,
};
pub use stats::{BehavioralSample, OverrunBias, ProjectWorkload};
pub use storage::{Backend, Config, DateRange, ScheduleDb, SegmentPatch, TaskPatch};
pub use timeline::{BusyInterval, FreeSlot, TimeGapDetector};
