//! Read-only views derived from the store: list filters, pagination, the
//! dashboard's next actions and pomodoro totals.

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::models::{Context, InboxItem, Project, ProjectTask};
use crate::store::Store;
use crate::utils::week_window;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InboxFilter {
    #[default]
    All,
    Today,
    Week,
}

impl InboxFilter {
    pub fn matches(self, item: &InboxItem, today: NaiveDate) -> bool {
        let created = item.created_at.date_naive();
        match self {
            Self::All => true,
            Self::Today => created == today,
            Self::Week => in_week(created, today),
        }
    }
}

impl FromStr for InboxFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            other => Err(format!("unknown inbox filter: {other}")),
        }
    }
}

impl fmt::Display for InboxFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    #[default]
    All,
    Today,
    Week,
    NoDue,
    Completed,
}

impl TaskFilter {
    /// Date filters and `NoDue` only ever show open tasks.
    pub fn matches(self, task: &ProjectTask, today: NaiveDate) -> bool {
        let open = !task.is_completed();
        match self {
            Self::All => true,
            Self::Today => open && task.due_date == Some(today),
            Self::Week => open && task.due_date.is_some_and(|due| in_week(due, today)),
            Self::NoDue => open && task.due_date.is_none(),
            Self::Completed => task.is_completed(),
        }
    }
}

impl FromStr for TaskFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "no_due" | "no-due" => Ok(Self::NoDue),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown task filter: {other}")),
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
            Self::NoDue => "no_due",
            Self::Completed => "completed",
        })
    }
}

fn in_week(date: NaiveDate, today: NaiveDate) -> bool {
    let (monday, sunday) = week_window(today);
    (monday..=sunday).contains(&date)
}

pub fn filter_inbox(items: &[InboxItem], filter: InboxFilter, today: NaiveDate) -> Vec<InboxItem> {
    items.iter().filter(|i| filter.matches(i, today)).cloned().collect()
}

pub fn filter_tasks(tasks: &[ProjectTask], filter: TaskFilter, today: NaiveDate) -> Vec<ProjectTask> {
    tasks.iter().filter(|t| filter.matches(t, today)).cloned().collect()
}

/// Case-insensitive substring match on project names. A blank query matches everything.
pub fn search_projects(projects: &[Project], query: &str) -> Vec<Project> {
    let needle = query.trim().to_lowercase();
    projects
        .iter()
        .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// "Load more" pagination over a filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    displayed_count: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            displayed_count: page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed_count
    }

    /// Back to a single page; called whenever the filter changes.
    pub fn reset(&mut self) {
        self.displayed_count = self.page_size;
    }

    /// Show one more page, never counting past `total`.
    pub fn load_more(&mut self, total: usize) {
        self.displayed_count = (self.displayed_count + self.page_size).min(total.max(self.page_size));
    }

    pub fn window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.displayed_count.min(items.len())]
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.displayed_count < total
    }

    pub fn remaining(&self, total: usize) -> usize {
        total.saturating_sub(self.displayed_count)
    }
}

/// Filter plus pagination for one list. Switching to a different filter
/// drops back to the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView<F> {
    filter: F,
    pages: Paginator,
}

impl<F: PartialEq> ListView<F> {
    pub fn new(filter: F, page_size: usize) -> Self {
        Self {
            filter,
            pages: Paginator::new(page_size),
        }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn pages(&self) -> &Paginator {
        &self.pages
    }

    pub fn set_filter(&mut self, filter: F) {
        if filter != self.filter {
            self.filter = filter;
            self.pages.reset();
        }
    }

    pub fn load_more(&mut self, total: usize) {
        self.pages.load_more(total);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextAction {
    pub project_id: i64,
    pub project_name: String,
    pub task: ProjectTask,
}

/// First not-started or in-progress task of each project, projects by rank.
pub fn next_actions(store: &Store) -> Vec<NextAction> {
    store
        .projects()
        .into_iter()
        .filter_map(|project| {
            let task = store
                .project_tasks(project.id)
                .into_iter()
                .find(|t| t.status.is_actionable())?;
            Some(NextAction {
                project_id: project.id,
                project_name: project.name,
                task,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBucket {
    /// `None` collects actions without a context.
    pub context: Option<Context>,
    pub actions: Vec<NextAction>,
}

/// Group next actions by context: computer, phone, home, office, then the
/// ones without a context. Empty buckets are left out.
pub fn group_by_context(actions: &[NextAction]) -> Vec<ContextBucket> {
    Context::ALL
        .iter()
        .copied()
        .map(Some)
        .chain(std::iter::once(None))
        .filter_map(|context| {
            let actions: Vec<_> = actions.iter().filter(|a| a.task.context == context).cloned().collect();
            (!actions.is_empty()).then_some(ContextBucket { context, actions })
        })
        .collect()
}

/// Active projects with no not-started or in-progress task left.
pub fn projects_without_next_action(store: &Store) -> Vec<Project> {
    store
        .projects()
        .into_iter()
        .filter(|p| p.is_active())
        .filter(|p| !store.project_tasks(p.id).iter().any(|t| t.status.is_actionable()))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PomodoroStats {
    pub today: u32,
    pub this_week: u32,
}

/// Completed pomodoros of tasks created today and since Monday.
pub fn pomodoro_stats(store: &Store, now: DateTime<Local>) -> PomodoroStats {
    let today = now.date_naive();
    let (monday, _) = week_window(today);
    store.all_tasks().iter().fold(PomodoroStats::default(), |mut stats, task| {
        let created = task.created_at.date_naive();
        let done = u32::from(task.pomodoros_done);
        if created == today {
            stats.today += done;
        }
        if created >= monday && created <= today {
            stats.this_week += done;
        }
        stats
    })
}
