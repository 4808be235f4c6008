//! The in-memory entity store: inbox items, projects, per-project task lists
//! and calendar events.
//!
//! Queries hand out owned snapshots; every change goes through a command
//! method so aggregate counters stay consistent. Lookups of unknown ids are
//! silent no-ops reported through `bool`/`Option` results.

mod calendar;
mod inbox;
mod projects;
mod tasks;

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::models::{CalendarEvent, InboxItem, Project, ProjectId, ProjectTask};
use crate::ordering;

/// Flat, serializable copy of every collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub inbox_items: Vec<InboxItem>,
    pub projects: Vec<Project>,
    pub tasks: Vec<ProjectTask>,
    pub events: Vec<CalendarEvent>,
}

/// Last id handed out per collection. Task ids are global across projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct IdCounters {
    inbox: i64,
    project: i64,
    task: i64,
    event: i64,
}

impl IdCounters {
    fn next(slot: &mut i64) -> i64 {
        *slot += 1;
        *slot
    }
}

pub struct Store {
    clock: Box<dyn Clock>,
    inbox: Vec<InboxItem>,
    projects: Vec<Project>,
    tasks: BTreeMap<ProjectId, Vec<ProjectTask>>,
    events: Vec<CalendarEvent>,
    ids: IdCounters,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("inbox", &self.inbox.len())
            .field("projects", &self.projects.len())
            .field("tasks", &self.tasks.values().map(Vec::len).sum::<usize>())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Store {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            inbox: Vec::new(),
            projects: Vec::new(),
            tasks: BTreeMap::new(),
            events: Vec::new(),
            ids: IdCounters::default(),
        }
    }

    /// Rebuild a store from a snapshot. Tasks whose project no longer exists
    /// are dropped, missing task ranks are backfilled, and id counters start
    /// above every loaded id.
    pub fn restore(snapshot: StoreSnapshot, clock: impl Clock + 'static) -> Self {
        let mut store = Self::new(clock);

        store.ids.inbox = snapshot.inbox_items.iter().map(|i| i.id).max().unwrap_or(0);
        store.ids.project = snapshot.projects.iter().map(|p| p.id).max().unwrap_or(0);
        store.ids.task = snapshot.tasks.iter().map(|t| t.id).max().unwrap_or(0);
        store.ids.event = snapshot.events.iter().map(|e| e.id).max().unwrap_or(0);

        store.inbox = snapshot.inbox_items;
        store.projects = snapshot.projects;
        store.events = snapshot.events;

        for task in snapshot.tasks {
            if store.projects.iter().any(|p| p.id == task.project_id) {
                store.tasks.entry(task.project_id).or_default().push(task);
            } else {
                warn!(task_id = task.id, project_id = task.project_id, "dropping task of missing project");
            }
        }
        for list in store.tasks.values_mut() {
            ordering::backfill_missing(list);
        }
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut projects = self.projects.clone();
        projects.sort_by(ordering::compare_projects);
        StoreSnapshot {
            inbox_items: self.inbox.clone(),
            tasks: projects
                .iter()
                .flat_map(|p| self.tasks.get(&p.id).into_iter().flatten().cloned())
                .collect(),
            projects,
            events: self.events.clone(),
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

/// Trimmed title, or `None` when nothing but whitespace was given.
fn clean_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::TaskDetails;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Local.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).single().unwrap())
    }

    #[test]
    fn snapshot_restore_keeps_counters_ahead() {
        let mut store = Store::new(clock());
        store.add_inbox_item("one");
        store.add_inbox_item("two");
        let project = store.add_project("Home").unwrap();
        let task = store.add_task(project.id, TaskDetails::titled("paint")).unwrap();

        let mut restored = Store::restore(store.snapshot(), clock());
        assert_eq!(restored.add_inbox_item("three").unwrap().id, 3);
        assert_eq!(restored.add_project("Work").unwrap().id, project.id + 1);
        assert_eq!(restored.add_task(project.id, TaskDetails::titled("sand")).unwrap().id, task.id + 1);
    }

    #[test]
    fn restore_drops_orphaned_tasks_and_backfills_order() {
        let mut store = Store::new(clock());
        let project = store.add_project("Garden").unwrap();
        store.add_task(project.id, TaskDetails::titled("weed")).unwrap();
        let mut snapshot = store.snapshot();

        let mut orphan = snapshot.tasks[0].clone();
        orphan.id = 50;
        orphan.project_id = 99;
        let mut legacy = snapshot.tasks[0].clone();
        legacy.id = 51;
        legacy.order = None;
        snapshot.tasks.push(orphan);
        snapshot.tasks.push(legacy);

        let restored = Store::restore(snapshot, clock());
        let tasks = restored.project_tasks(project.id);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].id, 51);
        assert_eq!(tasks[1].order, Some(1));
        assert!(restored.task(50).is_none());
    }

    #[test]
    fn clean_title_rejects_blank() {
        assert_eq!(clean_title("  "), None);
        assert_eq!(clean_title("  milk "), Some("milk".to_string()));
    }
}
