//! Scheduled workload per project key.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::schedule::{ProjectIndex, Task, TaskSegment};

/// Counts and scheduled minutes for one project key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWorkload {
    /// `"<company> · <project>"`
    pub key: String,
    pub task_count: usize,
    pub segment_count: usize,
    /// Minutes of time-boxed tasks plus their segments
    pub scheduled_minutes: i64,
    /// Tasks with an estimate but no time yet
    pub unscheduled_count: usize,
}

impl ProjectWorkload {
    fn new(key: String) -> Self {
        Self {
            key,
            task_count: 0,
            segment_count: 0,
            scheduled_minutes: 0,
            unscheduled_count: 0,
        }
    }
}

/// Aggregate tasks and their segments by project key.
///
/// Segments whose parent is not in `tasks` are ignored. The result is
/// sorted by scheduled minutes, largest first, then by key.
pub fn workload_by_project(
    tasks: &[Task],
    segments: &[TaskSegment],
    projects: &ProjectIndex,
) -> Vec<ProjectWorkload> {
    let mut by_key: HashMap<String, ProjectWorkload> = HashMap::new();
    let mut key_of_task: HashMap<&str, String> = HashMap::new();

    for task in tasks {
        let key = projects.project_key(task);
        let entry = by_key
            .entry(key.clone())
            .or_insert_with(|| ProjectWorkload::new(key.clone()));
        entry.task_count += 1;
        match task.time_range() {
            Some((start, end)) => entry.scheduled_minutes += (end - start).max(0),
            None if task.estimated_minutes().is_some() => entry.unscheduled_count += 1,
            None => {}
        }
        key_of_task.insert(task.id.as_str(), key);
    }

    for segment in segments {
        let Some(key) = key_of_task.get(segment.task_id.as_str()) else {
            continue;
        };
        if let Some(entry) = by_key.get_mut(key) {
            entry.segment_count += 1;
            entry.scheduled_minutes += segment.duration_minutes().max(0);
        }
    }

    let mut rows: Vec<ProjectWorkload> = by_key.into_values().collect();
    rows.sort_by(|a, b| {
        b.scheduled_minutes
            .cmp(&a.scheduled_minutes)
            .then_with(|| a.key.cmp(&b.key))
    });
    rows
}

/// Render workload as an ASCII table.
pub fn render_workload(rows: &[ProjectWorkload]) -> String {
    let mut output = String::new();
    output.push_str("Workload by project\n");
    output.push_str(&"=".repeat(64));
    output.push('\n');

    if rows.is_empty() {
        output.push_str("No tasks in range.\n");
        return output;
    }

    output.push_str(&format!(
        "{:<32} {:>6} {:>9} {:>7} {:>6}\n",
        "Project", "Tasks", "Segments", "Hours", "Open"
    ));
    output.push_str(&"-".repeat(64));
    output.push('\n');

    for row in rows {
        output.push_str(&format!(
            "{:<32} {:>6} {:>9} {:>7.1} {:>6}\n",
            truncate(&row.key, 32),
            row.task_count,
            row.segment_count,
            row.scheduled_minutes as f64 / 60.0,
            row.unscheduled_count
        ));
    }

    output
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::clock::{parse_date, parse_time_of_day};
    use chrono::NaiveTime;

    fn t(s: &str) -> NaiveTime {
        parse_time_of_day(s).unwrap()
    }

    #[test]
    fn groups_tasks_and_segments() {
        let day = parse_date("2026-10-19").unwrap();
        let a = Task::new("u", "a", day)
            .with_project(Some("Acme"), Some("Site"))
            .with_time(t("09:00"), t("10:30"));
        let b = Task::new("u", "b", day)
            .with_project(Some("Acme"), Some("Site"))
            .with_estimate(2.0);
        let c = Task::new("u", "c", day).with_time(t("11:00"), t("11:30"));
        let segment = TaskSegment::new(a.id.clone(), "u", 1, day, t("13:00"), t("14:00"));
        let orphan = TaskSegment::new("gone", "u", 1, day, t("15:00"), t("16:00"));

        let rows = workload_by_project(&[a, b, c], &[segment, orphan], &ProjectIndex::default());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "Acme · Site");
        assert_eq!(rows[0].task_count, 2);
        assert_eq!(rows[0].segment_count, 1);
        assert_eq!(rows[0].scheduled_minutes, 150);
        assert_eq!(rows[0].unscheduled_count, 1);
        assert_eq!(rows[1].key, "Unassigned · General");
        assert_eq!(rows[1].scheduled_minutes, 30);
    }

    #[test]
    fn render_empty() {
        assert!(render_workload(&[]).contains("No tasks in range."));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Acme · Website", 32), "Acme · Website");
        assert_eq!(truncate("Acme · Website", 8), "Acme ...");
    }
}
