//! Statistics for Daywright
//!
//! Behavioral overrun samples that bias future estimates, and workload
//! aggregation per project key.

mod estimate_accuracy;
mod workload;

pub use estimate_accuracy::{overrun_minutes, planned_finish, BehavioralSample, OverrunBias};
pub use workload::{render_workload, workload_by_project, ProjectWorkload};
