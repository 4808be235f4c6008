use chrono::{DateTime, Local};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{CalendarEvent, Context, InboxItem, Priority, Project, ProjectTask, TaskStatus};
use crate::store::StoreSnapshot;

const LAST_WEEKLY_REVIEW: &str = "lastWeeklyReview";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// In-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS inbox_items (
                id              INTEGER PRIMARY KEY,
                title           TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT
            );
            CREATE TABLE IF NOT EXISTS projects (
                id              INTEGER PRIMARY KEY,
                name            TEXT NOT NULL,
                total_tasks     INTEGER NOT NULL DEFAULT 0,
                completed_tasks INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                \"order\"        INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id                INTEGER PRIMARY KEY,
                project_id        INTEGER NOT NULL,
                title             TEXT NOT NULL,
                description       TEXT,
                status            TEXT NOT NULL DEFAULT 'not_started',
                context           TEXT,
                priority          TEXT,
                due_date          TEXT,
                pomodoros_planned INTEGER NOT NULL DEFAULT 0,
                pomodoros_done    INTEGER NOT NULL DEFAULT 0,
                created_at        TEXT NOT NULL,
                \"order\"          INTEGER,
                parent_task_id    INTEGER
            );
            CREATE TABLE IF NOT EXISTS calendar_events (
                id              INTEGER PRIMARY KEY,
                title           TEXT NOT NULL,
                description     TEXT,
                start_date      TEXT NOT NULL,
                start_time      TEXT,
                end_date        TEXT,
                end_time        TEXT,
                is_all_day      INTEGER NOT NULL DEFAULT 1,
                location        TEXT,
                reminder_date   TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);
            CREATE INDEX IF NOT EXISTS idx_calendar_events_start_date ON calendar_events(start_date);",
        )?;
        Ok(())
    }

    /// Replace every stored entity with the contents of `snapshot`.
    /// Settings are left alone.
    pub fn save_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM inbox_items; DELETE FROM projects; DELETE FROM tasks; DELETE FROM calendar_events;",
        )?;

        {
            let mut stmt = tx.prepare("INSERT INTO inbox_items (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)")?;
            for item in &snapshot.inbox_items {
                stmt.execute(rusqlite::params![item.id, item.title, item.created_at, item.updated_at])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO projects (id, name, total_tasks, completed_tasks, created_at, \"order\")
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for project in &snapshot.projects {
                stmt.execute(rusqlite::params![
                    project.id,
                    project.name,
                    project.total_tasks,
                    project.completed_tasks,
                    project.created_at,
                    project.order
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO tasks (id, project_id, title, description, status, context, priority, due_date,
                                    pomodoros_planned, pomodoros_done, created_at, \"order\", parent_task_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for task in &snapshot.tasks {
                stmt.execute(rusqlite::params![
                    task.id,
                    task.project_id,
                    task.title,
                    task.description,
                    task.status,
                    task.context,
                    task.priority,
                    task.due_date,
                    task.pomodoros_planned,
                    task.pomodoros_done,
                    task.created_at,
                    task.order,
                    task.parent_task_id
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO calendar_events (id, title, description, start_date, start_time, end_date, end_time,
                                              is_all_day, location, reminder_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for event in &snapshot.events {
                stmt.execute(rusqlite::params![
                    event.id,
                    event.title,
                    event.description,
                    event.start_date,
                    event.start_time,
                    event.end_date,
                    event.end_time,
                    event.is_all_day,
                    event.location,
                    event.reminder_date,
                    event.created_at,
                    event.updated_at
                ])?;
            }
        }

        tx.commit()?;
        info!(
            inbox = snapshot.inbox_items.len(),
            projects = snapshot.projects.len(),
            tasks = snapshot.tasks.len(),
            events = snapshot.events.len(),
            "saved snapshot"
        );
        Ok(())
    }

    /// Read every stored entity back into a snapshot.
    pub fn load_snapshot(&self) -> Result<StoreSnapshot, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT id, title, created_at, updated_at FROM inbox_items ORDER BY id")?;
        let inbox_items = stmt.query_map([], Self::row_to_inbox_item)?.collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, name, total_tasks, completed_tasks, created_at, \"order\" FROM projects ORDER BY id",
        )?;
        let projects = stmt.query_map([], Self::row_to_project)?.collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, description, status, context, priority, due_date,
                    pomodoros_planned, pomodoros_done, created_at, \"order\", parent_task_id
             FROM tasks ORDER BY id",
        )?;
        let tasks = stmt.query_map([], Self::row_to_task)?.collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, start_date, start_time, end_date, end_time,
                    is_all_day, location, reminder_date, created_at, updated_at
             FROM calendar_events ORDER BY id",
        )?;
        let events = stmt.query_map([], Self::row_to_event)?.collect::<Result<Vec<_>, _>>()?;

        debug!(
            inbox = inbox_items.len(),
            projects = projects.len(),
            tasks = tasks.len(),
            events = events.len(),
            "loaded snapshot"
        );
        Ok(StoreSnapshot {
            inbox_items,
            projects,
            tasks,
            events,
        })
    }

    fn row_to_inbox_item(row: &rusqlite::Row) -> Result<InboxItem, rusqlite::Error> {
        Ok(InboxItem {
            id: row.get(0)?,
            title: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    fn row_to_project(row: &rusqlite::Row) -> Result<Project, rusqlite::Error> {
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            total_tasks: row.get(2)?,
            completed_tasks: row.get(3)?,
            created_at: row.get(4)?,
            order: row.get(5)?,
        })
    }

    fn row_to_task(row: &rusqlite::Row) -> Result<ProjectTask, rusqlite::Error> {
        Ok(ProjectTask {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            status: row.get::<_, Option<TaskStatus>>(4)?.unwrap_or_default(),
            context: row.get(5)?,
            priority: row.get(6)?,
            due_date: row.get(7)?,
            pomodoros_planned: row.get(8)?,
            pomodoros_done: row.get(9)?,
            created_at: row.get(10)?,
            order: row.get(11)?,
            parent_task_id: row.get(12)?,
        })
    }

    fn row_to_event(row: &rusqlite::Row) -> Result<CalendarEvent, rusqlite::Error> {
        Ok(CalendarEvent {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            start_date: row.get(3)?,
            start_time: row.get(4)?,
            end_date: row.get(5)?,
            end_time: row.get(6)?,
            is_all_day: row.get(7)?,
            location: row.get(8)?,
            reminder_date: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", rusqlite::params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// When the last weekly review was completed, if ever.
    pub fn last_weekly_review(&self) -> Result<Option<DateTime<Local>>, DatabaseError> {
        let Some(raw) = self.get_setting(LAST_WEEKLY_REVIEW)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Local)))
            .map_err(|e| DatabaseError::InvalidSetting {
                key: LAST_WEEKLY_REVIEW.to_string(),
                message: e.to_string(),
            })
    }

    pub fn record_weekly_review(&self, at: DateTime<Local>) -> Result<(), DatabaseError> {
        self.set_setting(LAST_WEEKLY_REVIEW, &at.to_rfc3339())
    }
}

fn text_from_sql<T>(value: ValueRef<'_>) -> FromSqlResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.as_str()?.parse().map_err(|e: String| FromSqlError::Other(e.into()))
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

impl ToSql for Context {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Context {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{EventDetails, TaskDetails};
    use crate::store::Store;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn clock() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).single().unwrap())
    }

    fn populated_store() -> Store {
        let mut store = Store::new(clock());
        store.add_inbox_item("call plumber");
        let project = store.add_project("Kitchen").unwrap();
        store
            .add_task(
                project.id,
                TaskDetails {
                    context: Some(Context::Phone),
                    priority: Some(Priority::High),
                    due_date: NaiveDate::from_ymd_opt(2026, 10, 21),
                    pomodoros_planned: 2,
                    status: TaskStatus::InProgress,
                    ..TaskDetails::titled("get quotes")
                },
            )
            .unwrap();
        let mut details = EventDetails::all_day("Fitting", NaiveDate::from_ymd_opt(2026, 10, 23).unwrap());
        details.is_all_day = false;
        details.start_time = NaiveTime::from_hms_opt(10, 30, 0);
        details.reminder_date = NaiveDate::from_ymd_opt(2026, 10, 20);
        store.add_calendar_event(details);
        store
    }

    #[test]
    fn snapshot_survives_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("gtd.db");
        let snapshot = populated_store().snapshot();

        Database::new(&path).unwrap().save_snapshot(&snapshot).unwrap();
        let loaded = Database::new(&path).unwrap().load_snapshot().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn saving_replaces_previous_rows() {
        let db = Database::open_in_memory().unwrap();
        let mut store = populated_store();
        db.save_snapshot(&store.snapshot()).unwrap();

        let id = store.inbox_items()[0].id;
        store.remove_inbox_item(id);
        db.save_snapshot(&store.snapshot()).unwrap();
        assert!(db.load_snapshot().unwrap().inbox_items.is_empty());
    }

    #[test]
    fn missing_review_setting_means_never() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.last_weekly_review().unwrap(), None);

        let at = Local.with_ymd_and_hms(2026, 10, 12, 18, 0, 0).single().unwrap();
        db.record_weekly_review(at).unwrap();
        assert_eq!(db.last_weekly_review().unwrap(), Some(at));
    }

    #[test]
    fn malformed_review_setting_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting(LAST_WEEKLY_REVIEW, "last tuesday").unwrap();
        assert!(matches!(db.last_weekly_review(), Err(DatabaseError::InvalidSetting { .. })));
    }
}
