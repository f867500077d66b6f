//! SQLite-based storage for tasks, segments, events, projects, settings
//! and behavioral samples.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use super::data_dir;
use super::migrations;
use super::traits::{
    BehaviorLog, DateRange, FixedEventStore, ProjectRegistry, SegmentPatch, SettingsProvider,
    TaskPatch, TaskStore,
};
use crate::error::{CoreError, StoreError};
use crate::schedule::clock::{format_time, parse_date, parse_time_of_day};
use crate::schedule::{
    Deadline, DeadlineKind, FixedEvent, Project, Task, TaskSegment, TaskStatus, UserSettings,
};
use crate::stats::BehavioralSample;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TASK_COLUMNS: &str = "id, owner, title, company, project, project_id, task_date,
    start_time, end_time, is_milestone, estimated_hours, status, actual_start, actual_end,
    completed_at, priority, deadline_date, deadline_kind, dependencies, notes, created_at";

const SEGMENT_COLUMNS: &str =
    "id, task_id, owner, seg_order, seg_date, start_time, end_time, status";

// === Helper Functions ===

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn get_date(row: &Row, idx: usize) -> Result<NaiveDate, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_date(&raw).ok_or_else(|| conversion_error(idx, format!("invalid date '{raw}'")))
}

fn get_time(row: &Row, idx: usize) -> Result<NaiveTime, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_time_of_day(&raw).ok_or_else(|| conversion_error(idx, format!("invalid time '{raw}'")))
}

/// Nullable time; an unparseable value reads as "no time".
fn get_opt_time(row: &Row, idx: usize) -> Result<Option<NaiveTime>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().and_then(parse_time_of_day))
}

fn get_opt_timestamp(row: &Row, idx: usize) -> Result<Option<NaiveDateTime>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()))
}

fn get_status(row: &Row, idx: usize) -> Result<TaskStatus, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    Ok(TaskStatus::parse(&raw).unwrap_or_default())
}

fn get_deadline(row: &Row, date_idx: usize, kind_idx: usize) -> Result<Option<Deadline>, rusqlite::Error> {
    let date: Option<String> = row.get(date_idx)?;
    let kind: Option<String> = row.get(kind_idx)?;
    Ok(date.as_deref().and_then(parse_date).map(|date| Deadline {
        date,
        kind: kind
            .as_deref()
            .and_then(DeadlineKind::parse)
            .unwrap_or(DeadlineKind::Soft),
    }))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn range_params(range: DateRange) -> (Option<String>, Option<String>) {
    (range.from.map(format_date), range.to.map(format_date))
}

/// Build a Task from a row selected with [`TASK_COLUMNS`]
fn row_to_task(row: &Row) -> Result<Task, rusqlite::Error> {
    let dependencies_json: String = row.get(18)?;
    let dependencies: Vec<String> = serde_json::from_str(&dependencies_json).unwrap_or_default();
    let priority: i64 = row.get(15)?;
    let estimated_hours: Option<f64> = row.get(10)?;
    let created_at = get_opt_timestamp(row, 20)?.unwrap_or_default();

    Ok(Task {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        company: row.get(3)?,
        project: row.get(4)?,
        project_id: row.get(5)?,
        date: get_date(row, 6)?,
        start_time: get_opt_time(row, 7)?,
        end_time: get_opt_time(row, 8)?,
        is_milestone: row.get(9)?,
        estimated_hours: estimated_hours.filter(|h| h.is_finite() && *h > 0.0),
        status: get_status(row, 11)?,
        actual_start: get_opt_timestamp(row, 12)?,
        actual_end: get_opt_timestamp(row, 13)?,
        completed_at: get_opt_timestamp(row, 14)?,
        priority: priority.clamp(1, u8::MAX as i64) as u8,
        deadline: get_deadline(row, 16, 17)?,
        dependencies,
        notes: row.get(19)?,
        created_at,
    })
}

fn row_to_segment(row: &Row) -> Result<TaskSegment, rusqlite::Error> {
    let order: i64 = row.get(3)?;
    Ok(TaskSegment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        owner: row.get(2)?,
        order: order.max(0) as u32,
        date: get_date(row, 4)?,
        start_time: get_time(row, 5)?,
        end_time: get_time(row, 6)?,
        status: get_status(row, 7)?,
    })
}

fn row_to_event(row: &Row) -> Result<FixedEvent, rusqlite::Error> {
    Ok(FixedEvent {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        date: get_date(row, 3)?,
        start_time: get_time(row, 4)?,
        end_time: get_time(row, 5)?,
        source: row.get(6)?,
    })
}

fn row_to_project(row: &Row) -> Result<Project, rusqlite::Error> {
    let priority: i64 = row.get(3)?;
    Ok(Project {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        priority: priority.clamp(1, u8::MAX as i64) as u8,
        deadline: get_deadline(row, 4, 5)?,
    })
}

/// SQLite database for schedule storage.
///
/// Implements every collaborator trait the engine needs.
pub struct ScheduleDb {
    conn: Connection,
}

impl ScheduleDb {
    /// Open the schedule database at `<data dir>/daywright.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("daywright.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        // Base tables (v1 schema) first
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id               TEXT PRIMARY KEY,
                    owner            TEXT NOT NULL,
                    title            TEXT NOT NULL,
                    company          TEXT,
                    project          TEXT,
                    project_id       TEXT,
                    task_date        TEXT NOT NULL,
                    start_time       TEXT,
                    end_time         TEXT,
                    is_milestone     INTEGER NOT NULL DEFAULT 0,
                    estimated_hours  REAL,
                    status           TEXT NOT NULL DEFAULT 'planned',
                    actual_start     TEXT,
                    actual_end       TEXT,
                    completed_at     TEXT,
                    priority         INTEGER NOT NULL DEFAULT 2,
                    deadline_date    TEXT,
                    deadline_kind    TEXT,
                    dependencies     TEXT NOT NULL DEFAULT '[]',
                    notes            TEXT,
                    created_at       TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id             TEXT PRIMARY KEY,
                    owner          TEXT NOT NULL,
                    title          TEXT NOT NULL,
                    priority       INTEGER NOT NULL DEFAULT 2,
                    deadline_date  TEXT,
                    deadline_kind  TEXT
                );

                CREATE TABLE IF NOT EXISTS calendar_events (
                    id          TEXT PRIMARY KEY,
                    owner       TEXT NOT NULL,
                    title       TEXT NOT NULL,
                    event_date  TEXT NOT NULL,
                    start_time  TEXT NOT NULL,
                    end_time    TEXT NOT NULL,
                    source      TEXT NOT NULL DEFAULT 'manual'
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    owner          TEXT PRIMARY KEY,
                    work_start     TEXT NOT NULL,
                    work_end       TEXT NOT NULL,
                    break_minutes  INTEGER NOT NULL
                );",
            )
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        // Incremental migrations (v1 -> v2 -> v3)
        migrations::migrate(&self.conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    fn insert_task(&self, task: &Task) -> Result<(), rusqlite::Error> {
        let dependencies = serde_json::to_string(&task.dependencies)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn.execute(
            &format!(
                "INSERT INTO tasks ({TASK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21)"
            ),
            params![
                task.id,
                task.owner,
                task.title,
                task.company,
                task.project,
                task.project_id,
                format_date(task.date),
                task.start_time.map(format_time),
                task.end_time.map(format_time),
                task.is_milestone,
                task.estimated_hours,
                task.status.as_str(),
                task.actual_start.map(format_timestamp),
                task.actual_end.map(format_timestamp),
                task.completed_at.map(format_timestamp),
                task.priority as i64,
                task.deadline.map(|d| format_date(d.date)),
                task.deadline.map(|d| d.kind.as_str()),
                dependencies,
                task.notes,
                format_timestamp(task.created_at),
            ],
        )?;
        Ok(())
    }

    fn write_task(&self, task: &Task) -> Result<(), rusqlite::Error> {
        let dependencies = serde_json::to_string(&task.dependencies)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn.execute(
            "UPDATE tasks
             SET title = ?2, task_date = ?3, start_time = ?4, end_time = ?5,
                 estimated_hours = ?6, status = ?7, actual_start = ?8, actual_end = ?9,
                 completed_at = ?10, priority = ?11, deadline_date = ?12, deadline_kind = ?13,
                 dependencies = ?14, notes = ?15
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                format_date(task.date),
                task.start_time.map(format_time),
                task.end_time.map(format_time),
                task.estimated_hours,
                task.status.as_str(),
                task.actual_start.map(format_timestamp),
                task.actual_end.map(format_timestamp),
                task.completed_at.map(format_timestamp),
                task.priority as i64,
                task.deadline.map(|d| format_date(d.date)),
                task.deadline.map(|d| d.kind.as_str()),
                dependencies,
                task.notes,
            ],
        )?;
        Ok(())
    }

    fn insert_segment(&self, segment: &TaskSegment) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            &format!("INSERT INTO task_segments ({SEGMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                segment.id,
                segment.task_id,
                segment.owner,
                segment.order as i64,
                format_date(segment.date),
                format_time(segment.start_time),
                format_time(segment.end_time),
                segment.status.as_str(),
            ],
        )?;
        Ok(())
    }

    // === Projects ===

    pub fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO projects (id, owner, title, priority, deadline_date, deadline_kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.owner,
                project.title,
                project.priority as i64,
                project.deadline.map(|d| format_date(d.date)),
                project.deadline.map(|d| d.kind.as_str()),
            ],
        )?;
        Ok(())
    }

    /// Delete a project. Tasks referencing it keep the dangling id.
    pub fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "project",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // === Events ===

    pub fn delete_events(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut removed = 0;
        for id in ids {
            removed += self
                .conn
                .execute("DELETE FROM calendar_events WHERE id = ?1", params![id])?;
        }
        Ok(removed)
    }

    // === Settings ===

    pub fn save_user_settings(&self, owner: &str, settings: &UserSettings) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO user_settings (owner, work_start, work_end, break_minutes)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner) DO UPDATE SET
                 work_start = excluded.work_start,
                 work_end = excluded.work_end,
                 break_minutes = excluded.break_minutes",
            params![
                owner,
                format_time(settings.work_start),
                format_time(settings.work_end),
                settings.break_minutes as i64,
            ],
        )?;
        Ok(())
    }
}

impl TaskStore for ScheduleDb {
    fn list_tasks(&self, owner: &str, range: DateRange) -> Result<Vec<Task>, StoreError> {
        let (from, to) = range_params(range);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE owner = ?1
               AND (?2 IS NULL OR task_date >= ?2)
               AND (?3 IS NULL OR task_date <= ?3)
             ORDER BY task_date ASC, start_time IS NULL, start_time ASC, created_at ASC"
        ))?;
        let tasks = stmt
            .query_map(params![owner, from, to], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        for task in tasks {
            task.validate()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            self.insert_task(task)?;
        }
        Ok(())
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<(), StoreError> {
        let mut task = self.get_task(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "task",
            id: id.to_string(),
        })?;
        patch
            .apply(&mut task)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.write_task(&task)?;
        Ok(())
    }

    fn delete_tasks(&self, ids: &[String]) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        for id in ids {
            tx.execute("DELETE FROM task_segments WHERE task_id = ?1", params![id])?;
            removed += tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn list_segments(&self, owner: &str, range: DateRange) -> Result<Vec<TaskSegment>, StoreError> {
        let (from, to) = range_params(range);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SEGMENT_COLUMNS} FROM task_segments
             WHERE owner = ?1
               AND (?2 IS NULL OR seg_date >= ?2)
               AND (?3 IS NULL OR seg_date <= ?3)
             ORDER BY seg_date ASC, start_time ASC, seg_order ASC"
        ))?;
        let segments = stmt
            .query_map(params![owner, from, to], row_to_segment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(segments)
    }

    fn get_segment(&self, id: &str) -> Result<Option<TaskSegment>, StoreError> {
        let segment = self
            .conn
            .query_row(
                &format!("SELECT {SEGMENT_COLUMNS} FROM task_segments WHERE id = ?1"),
                params![id],
                row_to_segment,
            )
            .optional()?;
        Ok(segment)
    }

    fn task_segments(&self, task_id: &str) -> Result<Vec<TaskSegment>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SEGMENT_COLUMNS} FROM task_segments
             WHERE task_id = ?1
             ORDER BY seg_order ASC"
        ))?;
        let segments = stmt
            .query_map(params![task_id], row_to_segment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(segments)
    }

    fn replace_segments(&self, task_id: &str, segments: &[TaskSegment]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM task_segments WHERE task_id = ?1", params![task_id])?;
        for segment in segments {
            self.insert_segment(segment)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_segment(&self, id: &str, patch: &SegmentPatch) -> Result<(), StoreError> {
        let mut segment = self.get_segment(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "segment",
            id: id.to_string(),
        })?;
        patch
            .apply(&mut segment)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.conn.execute(
            "UPDATE task_segments
             SET seg_date = ?2, start_time = ?3, end_time = ?4, status = ?5
             WHERE id = ?1",
            params![
                segment.id,
                format_date(segment.date),
                format_time(segment.start_time),
                format_time(segment.end_time),
                segment.status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn clear_segments(&self, owner: &str) -> Result<usize, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM task_segments WHERE owner = ?1", params![owner])?;
        Ok(removed)
    }
}

impl FixedEventStore for ScheduleDb {
    fn list_events(&self, owner: &str, range: DateRange) -> Result<Vec<FixedEvent>, StoreError> {
        let (from, to) = range_params(range);
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, event_date, start_time, end_time, source
             FROM calendar_events
             WHERE owner = ?1
               AND (?2 IS NULL OR event_date >= ?2)
               AND (?3 IS NULL OR event_date <= ?3)
             ORDER BY event_date ASC, start_time ASC",
        )?;
        let events = stmt
            .query_map(params![owner, from, to], row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn insert_events(&self, events: &[FixedEvent]) -> Result<(), StoreError> {
        for event in events {
            self.conn.execute(
                "INSERT INTO calendar_events (id, owner, title, event_date, start_time, end_time, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.id,
                    event.owner,
                    event.title,
                    format_date(event.date),
                    format_time(event.start_time),
                    format_time(event.end_time),
                    event.source,
                ],
            )?;
        }
        Ok(())
    }
}

impl SettingsProvider for ScheduleDb {
    fn user_settings(&self, owner: &str) -> Result<Option<UserSettings>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT work_start, work_end, break_minutes FROM user_settings WHERE owner = ?1",
                params![owner],
                |row| {
                    let break_minutes: i64 = row.get(2)?;
                    Ok(UserSettings {
                        work_start: get_time(row, 0)?,
                        work_end: get_time(row, 1)?,
                        break_minutes: break_minutes.max(0) as u32,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

impl ProjectRegistry for ScheduleDb {
    fn list_projects(&self, owner: &str) -> Result<Vec<Project>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, priority, deadline_date, deadline_kind
             FROM projects WHERE owner = ?1 ORDER BY priority ASC, title ASC",
        )?;
        let projects = stmt
            .query_map(params![owner], row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }
}

impl BehaviorLog for ScheduleDb {
    fn recent_overruns(&self, owner: &str, limit: usize) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT overrun_minutes FROM behavioral_samples
             WHERE owner = ?1
             ORDER BY recorded_at DESC
             LIMIT ?2",
        )?;
        let overruns = stmt
            .query_map(params![owner, limit as i64], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(overruns)
    }

    fn record_overrun(&self, sample: &BehavioralSample) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO behavioral_samples (id, owner, task_id, overrun_minutes, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sample.id,
                sample.owner,
                sample.task_id,
                sample.overrun_minutes,
                format_timestamp(sample.recorded_at),
            ],
        )?;
        Ok(())
    }
}
