//! End-to-end scheduling passes against the SQLite store.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use daywright_core::schedule::clock::{format_time, parse_date, parse_time_of_day};
use daywright_core::storage::{FixedEventStore, ProjectRegistry, TaskStore};
use daywright_core::timeline::{BusyInterval, TimeGapDetector};
use daywright_core::{
    DateRange, FixedEvent, Project, ReconcileOutcome, ScheduleDb, ScheduleEngine, ScheduleRequest,
    Task, TaskStatus,
};

fn day(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn t(s: &str) -> NaiveTime {
    parse_time_of_day(s).unwrap()
}

fn monday() -> NaiveDate {
    day("2026-10-19")
}

/// Tasks with strictly increasing creation times, so store order is stable.
fn numbered(tasks: Vec<Task>) -> Vec<Task> {
    let base: NaiveDateTime = day("2026-10-01").and_time(t("08:00"));
    tasks
        .into_iter()
        .enumerate()
        .map(|(i, mut task)| {
            task.created_at = base + Duration::minutes(i as i64);
            task
        })
        .collect()
}

fn slot(db: &ScheduleDb, id: &str) -> (NaiveDate, String, String) {
    let task = db.get_task(id).unwrap().unwrap();
    (
        task.date,
        format_time(task.start_time.unwrap()),
        format_time(task.end_time.unwrap()),
    )
}

#[test]
fn free_slots_around_one_meeting() {
    let gaps = TimeGapDetector::new().find_gaps(&[BusyInterval::new(600, 660)], 540, 1020);
    let ranges: Vec<(i64, i64)> = gaps.iter().map(|g| (g.start, g.end)).collect();
    assert_eq!(ranges, vec![(540, 600), (660, 1020)]);
}

#[test]
fn focus_pass_interleaves_two_to_one() {
    let db = ScheduleDb::open_memory().unwrap();
    let focus = |title: &str| {
        Task::new("alice", title, monday())
            .with_estimate(1.0)
            .with_project(Some("Acme"), Some("Site"))
    };
    let normal = |title: &str| Task::new("alice", title, monday()).with_estimate(1.0);
    let tasks = numbered(vec![
        focus("F1"),
        focus("F2"),
        focus("F3"),
        normal("N1"),
        normal("N2"),
        normal("N3"),
    ]);
    db.insert_tasks(&tasks).unwrap();

    let request = ScheduleRequest::new("alice", monday()).with_focus(Some("Acme · Site".into()));
    let outcome = ScheduleEngine::new(&db).schedule(&request).unwrap();
    assert!(outcome.plan.unplaced.is_empty());

    let placed = db.list_tasks("alice", DateRange::day(monday())).unwrap();
    let order: Vec<&str> = placed.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(order, vec!["F1", "F2", "N1", "F3", "N2", "N3"]);
    assert!(placed.iter().all(|t| t.date == monday()));

    for pair in placed.windows(2) {
        assert!(pair[0].end_time.unwrap() <= pair[1].start_time.unwrap());
    }
    assert_eq!(format_time(placed[5].end_time.unwrap()), "16:15");
}

#[test]
fn long_work_spills_into_next_week() {
    let db = ScheduleDb::open_memory().unwrap();
    let friday = day("2026-10-23");
    let big = Task::new("alice", "Migration", friday).with_estimate(9.0);
    db.insert_tasks(&[big.clone()]).unwrap();

    let outcome = ScheduleEngine::new(&db)
        .schedule(&ScheduleRequest::new("alice", friday))
        .unwrap();
    let last = outcome.plan.placements.last().unwrap();
    assert_eq!(last.date, day("2026-10-26"));

    let segments = db.list_segments("alice", DateRange::all()).unwrap();
    let total: i64 = segments.iter().map(|s| s.duration_minutes()).sum::<i64>() + 90;
    assert_eq!(total, 9 * 60);
    assert_eq!(slot(&db, &big.id), (friday, "09:00".into(), "10:30".into()));
    assert!(segments.iter().all(|s| s.date != day("2026-10-24") && s.date != day("2026-10-25")));
}

#[test]
fn dependency_runs_before_urgent_dependent() {
    let db = ScheduleDb::open_memory().unwrap();
    let base = Task::new("alice", "Schema", monday())
        .with_estimate(1.0)
        .with_priority(3);
    let api = Task::new("alice", "API", monday())
        .with_estimate(1.0)
        .with_priority(1)
        .with_dependencies([base.id.clone()]);
    db.insert_tasks(&numbered(vec![api.clone(), base.clone()])).unwrap();

    ScheduleEngine::new(&db)
        .schedule(&ScheduleRequest::new("alice", monday()))
        .unwrap();
    assert_eq!(slot(&db, &base.id).1, "09:00");
    assert_eq!(slot(&db, &api.id).1, "10:15");
}

#[test]
fn project_priority_lifts_its_tasks() {
    let db = ScheduleDb::open_memory().unwrap();
    let urgent = Project::new("alice", "Launch", 1);
    db.insert_project(&urgent).unwrap();
    assert_eq!(db.list_projects("alice").unwrap().len(), 1);

    let plain = Task::new("alice", "Plain", monday()).with_estimate(1.0);
    let mut launch = Task::new("alice", "Launch prep", monday())
        .with_estimate(1.0)
        .with_priority(3);
    launch.project_id = Some(urgent.id.clone());
    db.insert_tasks(&numbered(vec![plain.clone(), launch.clone()])).unwrap();

    ScheduleEngine::new(&db)
        .schedule(&ScheduleRequest::new("alice", monday()))
        .unwrap();
    assert_eq!(slot(&db, &launch.id).1, "09:00");
    assert_eq!(slot(&db, &plain.id).1, "10:15");
}

#[test]
fn fixed_time_work_is_never_moved() {
    let db = ScheduleDb::open_memory().unwrap();
    let fixed = Task::new("alice", "Review", monday()).with_time(t("09:00"), t("12:00"));
    let floating = Task::new("alice", "Write", monday()).with_estimate(1.0);
    let event = FixedEvent::new("alice", "Lunch", monday(), t("12:00"), t("13:00"));
    db.insert_tasks(&[fixed.clone(), floating.clone()]).unwrap();
    db.insert_events(&[event]).unwrap();

    ScheduleEngine::new(&db)
        .schedule(&ScheduleRequest::new("alice", monday()))
        .unwrap();
    assert_eq!(slot(&db, &fixed.id), (monday(), "09:00".into(), "12:00".into()));
    assert_eq!(slot(&db, &floating.id), (monday(), "13:15".into(), "14:15".into()));
}

#[test]
fn refresh_rolls_forward_then_shifts() {
    let db = ScheduleDb::open_memory().unwrap();
    let stale = Task::new("alice", "Stale", day("2026-10-15")).with_estimate(1.0);
    let mut running = Task::new("alice", "Running", monday()).with_time(t("09:00"), t("10:00"));
    running.status = TaskStatus::InProgress;
    let next = Task::new("alice", "Next", monday()).with_time(t("10:00"), t("11:00"));
    db.insert_tasks(&[stale.clone(), running.clone(), next.clone()]).unwrap();

    let now = monday().and_time(t("10:20"));
    let refresh = ScheduleEngine::new(&db).refresh_today("alice", now).unwrap();

    assert_eq!(refresh.rolled.tasks.len(), 1);
    assert_eq!(db.get_task(&stale.id).unwrap().unwrap().date, monday());
    assert_eq!(refresh.reconcile.overrun().map(|o| o.minutes()), Some(20));
    assert!(matches!(refresh.reconcile, ReconcileOutcome::Shifted { .. }));
    assert_eq!(slot(&db, &next.id), (monday(), "10:20".into(), "11:20".into()));
}
