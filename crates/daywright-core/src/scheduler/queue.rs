//! Dependency-aware ordering of schedulable tasks.
//!
//! Tasks are first sorted by urgency, then peeled in rounds: a task joins
//! the queue once none of its dependencies is still waiting to be queued.
//! Dependencies outside the candidate set (completed, already time-boxed,
//! or dangling ids) count as satisfied. When a round makes no progress the
//! remainder is appended in sorted order so scheduling never stalls.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::schedule::{DeadlineKind, ProjectIndex, Task};

/// Upper bound on peeling rounds.
pub const PEEL_GUARD: usize = 10_000;

/// Tasks caught in, or waiting on, a dependency cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyReport {
    /// Tasks that sit on a cycle (including self-dependencies)
    pub cyclic: Vec<String>,
    /// Tasks outside any cycle that transitively depend on a cyclic task
    pub blocked: Vec<String>,
}

impl DependencyReport {
    pub fn has_cycle(&self) -> bool {
        !self.cyclic.is_empty()
    }
}

/// Output of [`resolve_order`].
#[derive(Debug, Clone)]
pub struct ResolvedQueue {
    pub tasks: Vec<Task>,
    pub report: DependencyReport,
    /// True when part of the queue was appended without honouring dependencies
    pub fell_back: bool,
}

/// Urgency order: effective priority, deadline date (none last), hard
/// before soft, then shorter estimate.
pub fn compare_tasks(a: &Task, b: &Task, projects: &ProjectIndex) -> Ordering {
    projects
        .effective_priority(a)
        .cmp(&projects.effective_priority(b))
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(da), Some(db)) => da.date.cmp(&db.date),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| {
            let hard_a = a.deadline.is_some_and(|d| d.kind == DeadlineKind::Hard);
            let hard_b = b.deadline.is_some_and(|d| d.kind == DeadlineKind::Hard);
            hard_b.cmp(&hard_a)
        })
        .then_with(|| {
            let est_a = a.estimated_hours.unwrap_or(0.0);
            let est_b = b.estimated_hours.unwrap_or(0.0);
            est_a.partial_cmp(&est_b).unwrap_or(Ordering::Equal)
        })
}

/// Stable sort by [`compare_tasks`].
pub fn sort_for_scheduling(tasks: &mut [Task], projects: &ProjectIndex) {
    tasks.sort_by(|a, b| compare_tasks(a, b, projects));
}

/// Find cycles among the candidates' dependency edges.
pub fn detect_cycles(tasks: &[Task]) -> DependencyReport {
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let edges: HashMap<&str, Vec<&str>> = tasks
        .iter()
        .map(|t| {
            let deps = t
                .dependencies
                .iter()
                .map(String::as_str)
                .filter(|d| ids.contains(d))
                .collect();
            (t.id.as_str(), deps)
        })
        .collect();

    let reachable: HashMap<&str, HashSet<&str>> = tasks
        .iter()
        .map(|t| (t.id.as_str(), reachable_from(t.id.as_str(), &edges)))
        .collect();

    let cyclic: HashSet<&str> = reachable
        .iter()
        .filter(|(id, reach)| reach.contains(*id))
        .map(|(id, _)| *id)
        .collect();

    let mut report = DependencyReport::default();
    for task in tasks {
        let id = task.id.as_str();
        if cyclic.contains(id) {
            report.cyclic.push(task.id.clone());
        } else if reachable[id].iter().any(|r| cyclic.contains(r)) {
            report.blocked.push(task.id.clone());
        }
    }
    report
}

fn reachable_from<'a>(start: &'a str, edges: &HashMap<&'a str, Vec<&'a str>>) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    let mut stack: Vec<&str> = edges.get(start).cloned().unwrap_or_default();
    while let Some(node) = stack.pop() {
        if seen.insert(node) {
            if let Some(next) = edges.get(node) {
                stack.extend(next.iter().copied());
            }
        }
    }
    seen
}

/// Build the scheduling queue for a candidate set.
pub fn resolve_order(mut tasks: Vec<Task>, projects: &ProjectIndex) -> ResolvedQueue {
    sort_for_scheduling(&mut tasks, projects);
    let report = detect_cycles(&tasks);

    let mut pending: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let mut remaining = tasks;
    let mut queue = Vec::with_capacity(remaining.len());
    let mut fell_back = false;
    let mut rounds = 0;

    while !remaining.is_empty() && rounds < PEEL_GUARD {
        rounds += 1;
        let mut progress = false;
        let mut i = 0;
        while i < remaining.len() {
            let ready = remaining[i]
                .dependencies
                .iter()
                .all(|dep| !pending.contains(dep));
            if ready {
                let task = remaining.remove(i);
                pending.remove(&task.id);
                queue.push(task);
                progress = true;
            } else {
                i += 1;
            }
        }
        if !progress {
            break;
        }
    }

    if !remaining.is_empty() {
        fell_back = true;
        queue.append(&mut remaining);
    }

    ResolvedQueue {
        tasks: queue,
        report,
        fell_back,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::clock::parse_date;
    use crate::schedule::{Deadline, Project};

    fn make_task(id: &str, priority: u8, hours: f64) -> Task {
        let mut task = Task::new("u", format!("Task {id}"), parse_date("2026-10-19").unwrap())
            .with_priority(priority)
            .with_estimate(hours);
        task.id = id.to_string();
        task
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn priority_then_deadline_then_kind_then_estimate() {
        let d1 = parse_date("2026-10-20").unwrap();
        let d2 = parse_date("2026-10-25").unwrap();
        let tasks = vec![
            make_task("no-deadline", 1, 0.5),
            make_task("late", 1, 1.0).with_deadline(Deadline::hard(d2)),
            make_task("soft-early", 1, 1.0).with_deadline(Deadline::soft(d1)),
            make_task("hard-early", 1, 3.0).with_deadline(Deadline::hard(d1)),
            make_task("low-priority", 3, 0.25),
            make_task("short", 2, 0.5),
            make_task("long", 2, 4.0),
        ];
        let resolved = resolve_order(tasks, &ProjectIndex::default());
        assert_eq!(
            ids(&resolved.tasks),
            vec![
                "hard-early",
                "soft-early",
                "late",
                "no-deadline",
                "short",
                "long",
                "low-priority"
            ]
        );
        assert!(!resolved.fell_back);
    }

    #[test]
    fn project_priority_lifts_task() {
        let project = Project::new("u", "Launch", 1);
        let mut lifted = make_task("lifted", 3, 1.0);
        lifted.project_id = Some(project.id.clone());
        let tasks = vec![make_task("plain", 2, 1.0), lifted];
        let resolved = resolve_order(tasks, &ProjectIndex::new([project]));
        assert_eq!(ids(&resolved.tasks), vec!["lifted", "plain"]);
    }

    #[test]
    fn dependency_is_queued_first() {
        let tasks = vec![
            make_task("deploy", 1, 1.0).with_dependencies(["build"]),
            make_task("build", 3, 1.0),
        ];
        let resolved = resolve_order(tasks, &ProjectIndex::default());
        assert_eq!(ids(&resolved.tasks), vec!["build", "deploy"]);
        assert!(!resolved.report.has_cycle());
    }

    #[test]
    fn dangling_dependency_is_satisfied() {
        let tasks = vec![make_task("a", 1, 1.0).with_dependencies(["missing"])];
        let resolved = resolve_order(tasks, &ProjectIndex::default());
        assert_eq!(ids(&resolved.tasks), vec!["a"]);
        assert!(!resolved.fell_back);
    }

    #[test]
    fn cycle_falls_back_to_sorted_order() {
        let tasks = vec![
            make_task("free", 3, 1.0),
            make_task("x", 1, 1.0).with_dependencies(["y"]),
            make_task("y", 2, 1.0).with_dependencies(["x"]),
            make_task("waits", 1, 2.0).with_dependencies(["x"]),
        ];
        let resolved = resolve_order(tasks, &ProjectIndex::default());
        assert!(resolved.fell_back);
        // "free" peels first, the rest keeps its pre-sorted order
        assert_eq!(ids(&resolved.tasks), vec!["free", "x", "waits", "y"]);

        let mut cyclic = resolved.report.cyclic.clone();
        cyclic.sort();
        assert_eq!(cyclic, vec!["x", "y"]);
        assert_eq!(resolved.report.blocked, vec!["waits"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks = vec![make_task("loop", 1, 1.0).with_dependencies(["loop"])];
        let report = detect_cycles(&tasks);
        assert_eq!(report.cyclic, vec!["loop"]);
    }
}
