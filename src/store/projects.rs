use tracing::debug;

use super::{IdCounters, Store, clean_title};
use crate::models::{OrderUpdate, Project, ProjectId};
use crate::ordering;

impl Store {
    /// Create a project ranked after every existing one.
    pub fn add_project(&mut self, name: &str) -> Option<Project> {
        let name = clean_title(name)?;
        let project = Project {
            id: IdCounters::next(&mut self.ids.project),
            name,
            total_tasks: 0,
            completed_tasks: 0,
            created_at: self.now(),
            order: ordering::next_order(&self.projects),
        };
        debug!(id = project.id, order = project.order, "added project");
        self.projects.push(project.clone());
        Some(project)
    }

    /// Delete a project together with its task list.
    pub fn delete_project(&mut self, id: ProjectId) -> Option<Project> {
        let index = self.projects.iter().position(|p| p.id == id)?;
        let removed_tasks = self.tasks.remove(&id).map_or(0, |tasks| tasks.len());
        debug!(id, removed_tasks, "deleted project");
        Some(self.projects.remove(index))
    }

    pub fn rename_project(&mut self, id: ProjectId, name: &str) -> bool {
        let Some(name) = clean_title(name) else {
            return false;
        };
        match self.projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                project.name = name;
                true
            }
            None => false,
        }
    }

    /// All projects by rank, newest first among equal ranks.
    pub fn projects(&self) -> Vec<Project> {
        let mut projects = self.projects.clone();
        projects.sort_by(ordering::compare_projects);
        projects
    }

    pub fn project(&self, id: ProjectId) -> Option<Project> {
        self.projects.iter().find(|p| p.id == id).cloned()
    }

    /// Bulk rank overwrite across all projects. Unknown ids are skipped.
    pub fn update_project_orders(&mut self, updates: &[OrderUpdate]) -> usize {
        let changed = ordering::apply_order_updates(&mut self.projects, updates);
        debug!(requested = updates.len(), changed, "updated project orders");
        changed
    }

    /// Recount completed tasks from the task list instead of trusting the counter.
    pub(super) fn recount_completed(&mut self, project_id: ProjectId) {
        let completed = self
            .tasks
            .get(&project_id)
            .map_or(0, |tasks| tasks.iter().filter(|t| t.is_completed()).count());
        if let Some(project) = self.projects.iter_mut().find(|p| p.id == project_id) {
            project.completed_tasks = u32::try_from(completed).unwrap_or(u32::MAX);
        }
    }
}
