//! Multi-step changes that span collections: inbox triage, the confirmation
//! gate for destructive commands, and drag-and-drop reordering.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{
    Context, EventId, InboxItemId, Priority, Project, ProjectId, ProjectTask, TaskDetails, TaskId, TaskStatus,
};
use crate::ordering;
use crate::store::Store;

/// Turn an inbox item into a project of the same name. Either both the
/// project appears and the item leaves the inbox, or nothing changes.
pub fn convert_to_project(store: &mut Store, item_id: InboxItemId) -> Option<Project> {
    let item = store.inbox_item(item_id)?;
    let project = store.add_project(&item.title)?;
    store.remove_inbox_item(item_id);
    info!(item_id, project_id = project.id, "converted inbox item to project");
    Some(project)
}

/// Mark an inbox item done. There is no archive, so it is simply removed.
pub fn complete_inbox_item(store: &mut Store, item_id: InboxItemId) -> bool {
    store.remove_inbox_item(item_id).is_some()
}

/// Pending inbox-to-task conversion. Details are collected first, the
/// target project is picked last.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConversion {
    item_id: InboxItemId,
    details: TaskDetails,
}

impl TaskConversion {
    pub fn begin(store: &Store, item_id: InboxItemId) -> Option<Self> {
        let item = store.inbox_item(item_id)?;
        Some(Self {
            item_id,
            details: TaskDetails::titled(item.title),
        })
    }

    pub fn item_id(&self) -> InboxItemId {
        self.item_id
    }

    pub fn details(&self) -> &TaskDetails {
        &self.details
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.details.description = Some(description.into());
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.details.context = Some(context);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.details.status = status;
        self
    }

    pub fn due_date(mut self, due: NaiveDate) -> Self {
        self.details.due_date = Some(due);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.details.priority = Some(priority);
        self
    }

    pub fn pomodoros(mut self, planned: u8) -> Self {
        self.details.pomodoros_planned = planned;
        self
    }

    /// Append the task to `project_id` and drop the inbox item. When the
    /// project or the item is gone the conversion is handed back untouched
    /// so another project can be picked.
    pub fn commit(self, store: &mut Store, project_id: ProjectId) -> Result<ProjectTask, Self> {
        if store.inbox_item(self.item_id).is_none() || store.project(project_id).is_none() {
            return Err(self);
        }
        let Some(task) = store.add_task(project_id, self.details.clone()) else {
            return Err(self);
        };
        store.remove_inbox_item(self.item_id);
        info!(item_id = self.item_id, task_id = task.id, project_id, "converted inbox item to task");
        Ok(task)
    }
}

/// A destructive command waiting for the user's go-ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteInboxItem(InboxItemId),
    CompleteInboxItem(InboxItemId),
    DeleteProject(ProjectId),
    DeleteEvent(EventId),
    CompleteTasks { project_id: ProjectId, task_ids: Vec<TaskId> },
}

impl PendingAction {
    /// Run the action. Returns whether anything changed.
    fn apply(&self, store: &mut Store) -> bool {
        match self {
            Self::DeleteInboxItem(id) => store.remove_inbox_item(*id).is_some(),
            Self::CompleteInboxItem(id) => complete_inbox_item(store, *id),
            Self::DeleteProject(id) => store.delete_project(*id).is_some(),
            Self::DeleteEvent(id) => store.delete_calendar_event(*id).is_some(),
            Self::CompleteTasks { project_id, task_ids } => store.complete_tasks(*project_id, task_ids) > 0,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::DeleteInboxItem(id) => format!("delete inbox item {id}"),
            Self::CompleteInboxItem(id) => format!("mark inbox item {id} done"),
            Self::DeleteProject(id) => format!("delete project {id} and all of its tasks"),
            Self::DeleteEvent(id) => format!("delete calendar event {id}"),
            Self::CompleteTasks { project_id, task_ids } => {
                format!("complete {} task(s) in project {project_id}", task_ids.len())
            }
        }
    }
}

/// Holds at most one pending destructive action. Requesting replaces
/// whatever was pending; only `confirm` touches the store.
#[derive(Debug, Default)]
pub struct Confirmation {
    pending: Option<PendingAction>,
}

impl Confirmation {
    pub fn request(&mut self, action: PendingAction) {
        debug!(action = %action.describe(), "confirmation requested");
        self.pending = Some(action);
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn confirm(&mut self, store: &mut Store) -> bool {
        match self.pending.take() {
            Some(action) => action.apply(store),
            None => false,
        }
    }

    pub fn cancel(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }
}

/// Commit a drag of the task at `from` to `to` within the displayed slice
/// of a project's tasks. Returns how many ranks were rewritten.
pub fn drop_task(store: &mut Store, project_id: ProjectId, displayed: &[TaskId], from: usize, to: usize) -> usize {
    let updates = ordering::plan_drop(&store.project_tasks(project_id), displayed, from, to);
    if updates.is_empty() {
        return 0;
    }
    store.update_task_orders(project_id, &updates)
}

/// Same as [`drop_task`] for the project list.
pub fn drop_project(store: &mut Store, displayed: &[ProjectId], from: usize, to: usize) -> usize {
    let updates = ordering::plan_drop(&store.projects(), displayed, from, to);
    if updates.is_empty() {
        return 0;
    }
    store.update_project_orders(&updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Local, TimeZone};

    fn store() -> Store {
        Store::new(FixedClock(Local.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).single().unwrap()))
    }

    #[test]
    fn convert_to_project_moves_item() {
        let mut store = store();
        let item = store.add_inbox_item("Plan trip").unwrap();
        let project = convert_to_project(&mut store, item.id).unwrap();
        assert_eq!(project.name, "Plan trip");
        assert!(store.inbox_items().is_empty());
        assert!(convert_to_project(&mut store, item.id).is_none());
        assert_eq!(store.projects().len(), 1);
    }

    #[test]
    fn task_conversion_keeps_details_when_project_missing() {
        let mut store = store();
        let item = store.add_inbox_item("Renew passport").unwrap();
        let pending = TaskConversion::begin(&store, item.id)
            .unwrap()
            .context(Context::Computer)
            .priority(Priority::High)
            .pomodoros(2);

        let pending = pending.commit(&mut store, 404).unwrap_err();
        assert_eq!(pending.details().context, Some(Context::Computer));
        assert_eq!(store.inbox_items().len(), 1);

        let project = store.add_project("Admin").unwrap();
        let task = pending.commit(&mut store, project.id).unwrap();
        assert_eq!(task.title, "Renew passport");
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.pomodoros_planned, 2);
        assert!(store.inbox_items().is_empty());
        assert_eq!(store.project(project.id).unwrap().total_tasks, 1);
    }

    #[test]
    fn cancel_leaves_store_untouched() {
        let mut store = store();
        let item = store.add_inbox_item("maybe").unwrap();
        let mut gate = Confirmation::default();

        gate.request(PendingAction::DeleteInboxItem(item.id));
        assert_eq!(gate.cancel(), Some(PendingAction::DeleteInboxItem(item.id)));
        assert!(!gate.confirm(&mut store));
        assert_eq!(store.inbox_items().len(), 1);

        gate.request(PendingAction::CompleteInboxItem(item.id));
        assert!(gate.confirm(&mut store));
        assert!(store.inbox_items().is_empty());
        assert!(gate.pending().is_none());
    }

    #[test]
    fn confirmed_bulk_complete_recounts() {
        let mut store = store();
        let p = store.add_project("p").unwrap();
        let a = store.add_task(p.id, TaskDetails::titled("a")).unwrap();
        let b = store.add_task(p.id, TaskDetails::titled("b")).unwrap();
        let mut gate = Confirmation::default();
        gate.request(PendingAction::CompleteTasks {
            project_id: p.id,
            task_ids: vec![a.id, b.id],
        });
        assert!(gate.confirm(&mut store));
        assert_eq!(store.project(p.id).unwrap().completed_tasks, 2);
    }

    #[test]
    fn drop_project_renumbers() {
        let mut store = store();
        let ids: Vec<_> = ["a", "b", "c"].iter().map(|n| store.add_project(n).unwrap().id).collect();
        assert_eq!(drop_project(&mut store, &ids, 0, 2), 3);
        let order: Vec<_> = store.projects().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![ids[1], ids[2], ids[0]]);
        assert_eq!(drop_project(&mut store, &order, 1, 1), 0);
    }
}
