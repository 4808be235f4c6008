use chrono::Duration;
use tracing::{debug, warn};

use super::{IdCounters, Store, clean_title};
use crate::models::{
    MAX_POMODOROS, OrderUpdate, ProjectId, ProjectTask, TaskDetails, TaskId, TaskPatch, TaskStatus, clamp_pomodoros,
};
use crate::ordering;

impl Store {
    /// Tasks of one project by rank. Unranked tasks are placed after the
    /// ranked ones and pomodoro counters are clamped into range.
    pub fn project_tasks(&self, project_id: ProjectId) -> Vec<ProjectTask> {
        let mut tasks = self.tasks.get(&project_id).cloned().unwrap_or_default();
        ordering::backfill_missing(&mut tasks);
        for task in &mut tasks {
            task.pomodoros_planned = task.pomodoros_planned.min(MAX_POMODOROS);
            task.pomodoros_done = task.pomodoros_done.min(MAX_POMODOROS);
        }
        tasks.sort_by(ordering::compare_tasks);
        tasks
    }

    /// Every task of every project, projects by rank and tasks by rank.
    pub fn all_tasks(&self) -> Vec<ProjectTask> {
        self.projects()
            .iter()
            .flat_map(|project| self.project_tasks(project.id))
            .collect()
    }

    pub fn task(&self, id: TaskId) -> Option<ProjectTask> {
        self.tasks.values().flatten().find(|t| t.id == id).cloned()
    }

    /// Append a task to a project and bump its task total.
    /// Does nothing when the project is unknown or the title is blank.
    pub fn add_task(&mut self, project_id: ProjectId, details: TaskDetails) -> Option<ProjectTask> {
        let title = clean_title(&details.title)?;
        let project = self.projects.iter_mut().find(|p| p.id == project_id)?;
        project.total_tasks += 1;

        let created_at = self.clock.now();
        let list = self.tasks.entry(project_id).or_default();
        let task = ProjectTask {
            id: IdCounters::next(&mut self.ids.task),
            project_id,
            title,
            description: details.description.filter(|d| !d.trim().is_empty()),
            status: details.status,
            context: details.context,
            priority: details.priority,
            due_date: details.due_date,
            pomodoros_planned: details.pomodoros_planned.min(MAX_POMODOROS),
            pomodoros_done: details.pomodoros_done.min(MAX_POMODOROS),
            created_at,
            order: Some(ordering::next_order(list.as_slice())),
            parent_task_id: details.parent_task_id,
        };
        debug!(id = task.id, project_id, order = ?task.order, "added task");
        list.push(task.clone());

        if task.is_completed() {
            self.recount_completed(project_id);
        }
        Some(task)
    }

    /// Apply a partial update. Status changes recount the project's completed tasks.
    /// A blank title rejects the whole patch.
    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Option<ProjectTask> {
        let title = match patch.title.as_deref().map(clean_title) {
            Some(None) => return None,
            title => title.flatten(),
        };
        let task = self.task_mut(id)?;
        let status_before = task.status;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description.filter(|d| !d.trim().is_empty());
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(context) = patch.context {
            task.context = context;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(planned) = patch.pomodoros_planned {
            task.pomodoros_planned = clamp_pomodoros(planned);
        }
        if let Some(done) = patch.pomodoros_done {
            task.pomodoros_done = clamp_pomodoros(done);
        }

        let updated = task.clone();
        if updated.status != status_before {
            self.recount_completed(updated.project_id);
        }
        Some(updated)
    }

    pub fn set_task_status(&mut self, id: TaskId, status: TaskStatus) -> Option<ProjectTask> {
        self.update_task(
            id,
            TaskPatch {
                status: Some(status),
                ..TaskPatch::default()
            },
        )
    }

    /// Flip between completed and not started.
    pub fn toggle_task_complete(&mut self, id: TaskId) -> Option<ProjectTask> {
        let next = if self.task(id)?.is_completed() {
            TaskStatus::NotStarted
        } else {
            TaskStatus::Completed
        };
        self.set_task_status(id, next)
    }

    /// Mark the selected tasks of one project completed and recount the
    /// project's completed total from scratch. Returns how many ids matched.
    pub fn complete_tasks(&mut self, project_id: ProjectId, ids: &[TaskId]) -> usize {
        let Some(list) = self.tasks.get_mut(&project_id) else {
            return 0;
        };
        let mut matched = 0;
        for task in list.iter_mut().filter(|t| ids.contains(&t.id)) {
            task.status = TaskStatus::Completed;
            matched += 1;
        }
        self.recount_completed(project_id);
        debug!(project_id, matched, "bulk completed tasks");
        matched
    }

    /// Push the due date out by `days` from the current due date, or from
    /// today when there is none. A completed task is reopened. Does nothing
    /// when the new date falls outside the representable range.
    pub fn defer_task(&mut self, id: TaskId, days: i64) -> Option<ProjectTask> {
        let today = self.clock.today();
        let task = self.task(id)?;
        let base = task.due_date.unwrap_or(today);
        let Some(due) = Duration::try_days(days).and_then(|d| base.checked_add_signed(d)) else {
            warn!(id, days, "defer out of range");
            return None;
        };
        let status = if task.is_completed() {
            TaskStatus::NotStarted
        } else {
            task.status
        };
        self.update_task(
            id,
            TaskPatch {
                due_date: Some(Some(due)),
                status: Some(status),
                ..TaskPatch::default()
            },
        )
    }

    pub fn inc_pomodoro(&mut self, id: TaskId) -> Option<ProjectTask> {
        let planned = i64::from(self.task(id)?.pomodoros_planned);
        self.update_task(
            id,
            TaskPatch {
                pomodoros_planned: Some(planned + 1),
                ..TaskPatch::default()
            },
        )
    }

    pub fn dec_pomodoro(&mut self, id: TaskId) -> Option<ProjectTask> {
        let planned = i64::from(self.task(id)?.pomodoros_planned);
        self.update_task(
            id,
            TaskPatch {
                pomodoros_planned: Some(planned - 1),
                ..TaskPatch::default()
            },
        )
    }

    pub fn inc_pomodoro_done(&mut self, id: TaskId) -> Option<ProjectTask> {
        let done = i64::from(self.task(id)?.pomodoros_done);
        self.update_task(
            id,
            TaskPatch {
                pomodoros_done: Some(done + 1),
                ..TaskPatch::default()
            },
        )
    }

    /// Bulk rank overwrite within one project. Unknown ids are skipped.
    pub fn update_task_orders(&mut self, project_id: ProjectId, updates: &[OrderUpdate]) -> usize {
        let Some(list) = self.tasks.get_mut(&project_id) else {
            return 0;
        };
        let changed = ordering::apply_order_updates(list, updates);
        debug!(project_id, requested = updates.len(), changed, "updated task orders");
        changed
    }

    /// Move a single task to `new_order`, shifting its neighbours by one.
    pub fn update_task_order(&mut self, project_id: ProjectId, task_id: TaskId, new_order: i64) -> bool {
        self.tasks
            .get_mut(&project_id)
            .is_some_and(|list| ordering::move_to_order(list, task_id, new_order))
    }

    fn task_mut(&mut self, id: TaskId) -> Option<&mut ProjectTask> {
        self.tasks.values_mut().flatten().find(|t| t.id == id)
    }
}
