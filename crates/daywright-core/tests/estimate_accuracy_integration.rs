//! Integration tests for behavioral overrun tracking.

use chrono::{Duration, NaiveDateTime};
use daywright_core::schedule::clock::{format_time, parse_date, parse_time_of_day};
use daywright_core::storage::{BehaviorLog, TaskStore};
use daywright_core::{
    BehavioralSample, OverrunBias, ScheduleDb, ScheduleEngine, ScheduleRequest, SchedulerConfig,
    Task,
};

fn base() -> NaiveDateTime {
    parse_date("2026-10-16")
        .unwrap()
        .and_time(parse_time_of_day("09:00").unwrap())
}

#[test]
fn test_full_overrun_workflow() {
    let db = ScheduleDb::open_memory().unwrap();
    let date = base().date();
    let early = Task::new("alice", "Early", date).with_time(
        parse_time_of_day("09:00").unwrap(),
        parse_time_of_day("10:00").unwrap(),
    );
    let late = Task::new("alice", "Late", date).with_time(
        parse_time_of_day("10:00").unwrap(),
        parse_time_of_day("11:00").unwrap(),
    );
    db.insert_tasks(&[early.clone(), late.clone()]).unwrap();

    let engine = ScheduleEngine::new(&db);
    // Finished 10 minutes ahead of plan: counts as zero
    engine
        .complete_task(&early.id, base() + Duration::minutes(50))
        .unwrap();
    // Finished 30 minutes late
    engine
        .complete_task(&late.id, base() + Duration::minutes(150))
        .unwrap();

    let overruns = db.recent_overruns("alice", 20).unwrap();
    assert_eq!(overruns, vec![30, 0]);

    let (ctx, bias) = engine.build_context("alice", date, None).unwrap();
    assert_eq!(bias.sample_count, 2);
    assert!((ctx.bias_minutes - 15.0).abs() < f64::EPSILON);
}

#[test]
fn test_split_task_on_time_adds_no_bias() {
    let db = ScheduleDb::open_memory().unwrap();
    let monday = parse_date("2026-10-19").unwrap();
    let tuesday = parse_date("2026-10-20").unwrap();
    let split = Task::new("alice", "Split", monday).with_estimate(2.0);
    db.insert_tasks(&[split.clone()]).unwrap();

    let engine = ScheduleEngine::new(&db);
    engine.schedule(&ScheduleRequest::new("alice", monday)).unwrap();
    assert_eq!(db.task_segments(&split.id).unwrap().len(), 1);

    // Finished just as the last chunk (10:45-11:15) ends
    let finish = monday.and_time(parse_time_of_day("11:15").unwrap());
    let completion = engine.complete_task(&split.id, finish).unwrap();
    assert_eq!(completion.sample.unwrap().overrun_minutes, 0);

    let follow_up = Task::new("alice", "Follow-up", tuesday).with_estimate(0.5);
    db.insert_tasks(&[follow_up.clone()]).unwrap();
    engine.schedule(&ScheduleRequest::new("alice", tuesday)).unwrap();
    let placed = db.get_task(&follow_up.id).unwrap().unwrap();
    assert_eq!(format_time(placed.start_time.unwrap()), "09:00");
    assert_eq!(format_time(placed.end_time.unwrap()), "09:30");
}

#[test]
fn test_sample_window_limits_history() {
    let db = ScheduleDb::open_memory().unwrap();
    // Oldest sample is huge; newer ones are small
    db.record_overrun(&BehavioralSample::new("alice", "t0", 600, base()))
        .unwrap();
    for i in 1..=3 {
        let at = base() + Duration::hours(i);
        db.record_overrun(&BehavioralSample::new("alice", format!("t{i}"), 6, at))
            .unwrap();
    }

    let config = SchedulerConfig {
        sample_window: 3,
        ..SchedulerConfig::default()
    };
    let (_, bias) = ScheduleEngine::new(&db)
        .with_config(config)
        .build_context("alice", base().date(), None)
        .unwrap();
    assert_eq!(bias.sample_count, 3);
    assert!((bias.minutes - 6.0).abs() < f64::EPSILON);
}

#[test]
fn test_no_history_means_no_bias() {
    let db = ScheduleDb::open_memory().unwrap();
    let (ctx, bias) = ScheduleEngine::new(&db)
        .build_context("alice", base().date(), None)
        .unwrap();
    assert_eq!(bias, OverrunBias::none());
    assert_eq!(ctx.bias_minutes, 0.0);
}
