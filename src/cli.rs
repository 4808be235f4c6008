use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::models::{
    CalendarEntry, Context, EventDetails, EventPatch, Priority, ProjectId, ProjectTask, TaskDetails, TaskId,
    TaskPatch, TaskStatus,
};
use crate::query::{self, InboxFilter, ListView, Paginator, TaskFilter};
use crate::review;
use crate::store::{Store, StoreSnapshot};
use crate::transitions::{self, Confirmation, PendingAction, TaskConversion};
use crate::utils::{parse_date, parse_time};

#[derive(Parser)]
#[command(name = "gtd")]
#[command(about = "Inbox, projects, tasks and calendar for a GTD-style workflow")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Skip confirmation prompts for destructive commands
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a thought into the inbox
    Capture {
        /// Item title; multiple words are joined
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Work through the inbox
    Inbox {
        #[command(subcommand)]
        command: InboxCommand,
    },
    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Manage tasks inside projects
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Calendar events and the tickler file
    Calendar {
        #[command(subcommand)]
        command: CalendarCommand,
    },
    /// Next actions, stalled projects and today's pomodoros (default)
    Dashboard,
    /// Weekly review checklist
    Review {
        /// Record that the review was done now
        #[arg(long)]
        done: bool,
    },
    /// Dump everything as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum InboxCommand {
    /// List inbox items, newest first
    List {
        #[arg(long, default_value = "all", value_parser = parse_inbox_filter)]
        filter: InboxFilter,
        /// Number of pages to show
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Change an item's title
    Edit { id: i64, title: String },
    /// Delete an item
    Delete { id: i64 },
    /// Mark an item done, removing it from the inbox
    Done { id: i64 },
    /// Turn an item into a project
    ToProject { id: i64 },
    /// Turn an item into a task of an existing project
    ToTask {
        id: i64,
        /// Target project id
        #[arg(long)]
        project: ProjectId,
        #[command(flatten)]
        details: TaskArgs,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project
    Add { name: String },
    /// List projects by rank
    List {
        /// Only projects whose name contains this text
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Rename a project
    Rename { id: ProjectId, name: String },
    /// Delete a project and all of its tasks
    Delete { id: ProjectId },
    /// Drag a project to another position of the (searched) list
    Move {
        id: ProjectId,
        /// Zero-based target position in the listed view
        to: usize,
        #[arg(long)]
        search: Option<String>,
    },
    /// Complete several tasks of a project at once
    Complete {
        project: ProjectId,
        #[arg(required = true)]
        tasks: Vec<TaskId>,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Append a task to a project
    Add {
        project: ProjectId,
        title: String,
        #[command(flatten)]
        details: TaskArgs,
    },
    /// List a project's tasks by rank
    List {
        project: ProjectId,
        #[arg(long, default_value = "all", value_parser = parse_task_filter)]
        filter: TaskFilter,
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Change fields of a task
    Update {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long, conflicts_with = "clear_context")]
        context: Option<Context>,
        #[arg(long)]
        clear_context: bool,
        #[arg(long, conflicts_with = "clear_priority")]
        priority: Option<Priority>,
        #[arg(long)]
        clear_priority: bool,
        #[arg(long, value_parser = parse_date_arg, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
        /// Planned pomodoros, clamped to 0..=4
        #[arg(long, allow_negative_numbers = true)]
        pomodoros: Option<i64>,
        /// Completed pomodoros, clamped to 0..=4
        #[arg(long, allow_negative_numbers = true)]
        pomodoros_done: Option<i64>,
    },
    /// Toggle between completed and not started
    Toggle { id: TaskId },
    /// Push the due date out
    Defer {
        id: TaskId,
        #[arg(long, default_value_t = 1)]
        days: i64,
    },
    /// Adjust pomodoro counters
    Pomodoro { id: TaskId, action: PomodoroAction },
    /// Drag a task to another position of the (filtered) list
    Move {
        project: ProjectId,
        id: TaskId,
        /// Zero-based target position in the listed view, or the new rank with --rank
        to: usize,
        #[arg(long, default_value = "all", value_parser = parse_task_filter)]
        filter: TaskFilter,
        /// Treat TO as an absolute rank and shift the tasks in between
        #[arg(long)]
        rank: bool,
    },
}

#[derive(Subcommand)]
pub enum CalendarCommand {
    /// Events and due tasks in a date range
    List {
        #[arg(long, value_parser = parse_date_arg)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date_arg)]
        to: Option<NaiveDate>,
    },
    /// Everything on one day (today by default)
    Day {
        #[arg(value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Create an event; it is all-day unless a time is given
    Add {
        title: String,
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time_arg)]
        time: Option<NaiveTime>,
        #[arg(long, value_parser = parse_date_arg)]
        end_date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_time_arg)]
        end_time: Option<NaiveTime>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Resurface the event in the tickler from this date on
        #[arg(long, value_parser = parse_date_arg)]
        reminder: Option<NaiveDate>,
    },
    /// Change an event
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_time_arg)]
        time: Option<NaiveTime>,
        #[arg(long, value_parser = parse_date_arg)]
        end_date: Option<NaiveDate>,
        #[arg(long, value_parser = parse_time_arg)]
        end_time: Option<NaiveTime>,
        #[arg(long)]
        all_day: Option<bool>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, value_parser = parse_date_arg, conflicts_with = "clear_reminder")]
        reminder: Option<NaiveDate>,
        #[arg(long)]
        clear_reminder: bool,
    },
    /// Delete an event
    Delete { id: i64 },
    /// Events whose reminder date has come
    Tickler,
}

/// Optional task fields shared by `task add` and `inbox to-task`.
#[derive(clap::Args, Debug, Default)]
pub struct TaskArgs {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub context: Option<Context>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long, value_parser = parse_date_arg)]
    pub due: Option<NaiveDate>,
    /// Planned pomodoros, clamped to 0..=4
    #[arg(long, default_value_t = 0)]
    pub pomodoros: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PomodoroAction {
    /// Plan one more
    Plan,
    /// Plan one less
    Unplan,
    /// Record one as done
    Done,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to serialize export: {0}")]
    ExportError(#[from] serde_json::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|e| format!("invalid date '{value}' (expected YYYY-MM-DD): {e}"))
}

fn parse_time_arg(value: &str) -> Result<NaiveTime, String> {
    parse_time(value).map_err(|e| format!("invalid time '{value}' (expected HH:MM): {e}"))
}

fn parse_inbox_filter(value: &str) -> Result<InboxFilter, String> {
    value.parse()
}

fn parse_task_filter(value: &str) -> Result<TaskFilter, String> {
    value.parse()
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    exported_at: DateTime<Local>,
    last_weekly_review: Option<DateTime<Local>>,
    #[serde(flatten)]
    data: &'a StoreSnapshot,
}

/// Everything a command needs: the loaded store, the database for
/// settings, the config, and the terminal.
pub struct Session<'a> {
    pub store: &'a mut Store,
    pub db: &'a Database,
    pub config: &'a Config,
    pub out: &'a mut dyn Write,
    pub input: &'a mut dyn BufRead,
    pub assume_yes: bool,
}

impl Session<'_> {
    /// Run one command. Returns whether the store changed and needs saving.
    pub fn run(&mut self, command: Commands) -> Result<bool, CliError> {
        match command {
            Commands::Capture { title } => self.capture(&title.join(" ")),
            Commands::Inbox { command } => self.inbox(command),
            Commands::Project { command } => self.project(command),
            Commands::Task { command } => self.task(command),
            Commands::Calendar { command } => self.calendar(command),
            Commands::Dashboard => self.dashboard().map(|()| false),
            Commands::Review { done } => self.review(done).map(|()| false),
            Commands::Export { output } => self.export(output).map(|()| false),
        }
    }

    fn capture(&mut self, title: &str) -> Result<bool, CliError> {
        let item = self
            .store
            .add_inbox_item(title)
            .ok_or_else(|| CliError::InvalidInput("title must not be blank".to_string()))?;
        writeln!(self.out, "Captured inbox item (ID: {})", item.id)?;
        Ok(true)
    }

    fn inbox(&mut self, command: InboxCommand) -> Result<bool, CliError> {
        match command {
            InboxCommand::List { filter, pages } => {
                let today = self.store.clock().today();
                let mut view = ListView::new(InboxFilter::default(), self.config.inbox_page_size);
                view.set_filter(filter);
                let items = query::filter_inbox(&self.store.inbox_items(), *view.filter(), today);
                let pager = paginate(&mut view, pages, items.len());
                for item in pager.window(&items) {
                    writeln!(self.out, "#{:<4} {}  {}", item.id, item.created_at.format("%Y-%m-%d"), item.title)?;
                }
                self.more_hint(&pager, items.len())?;
                Ok(false)
            }
            InboxCommand::Edit { id, title } => {
                if !self.store.update_inbox_item(id, &title) {
                    return Err(missing_or_blank("inbox item", id));
                }
                writeln!(self.out, "Inbox item updated")?;
                Ok(true)
            }
            InboxCommand::Delete { id } => {
                self.require(self.store.inbox_item(id).is_some(), "inbox item", id)?;
                self.confirm(PendingAction::DeleteInboxItem(id))
            }
            InboxCommand::Done { id } => {
                self.require(self.store.inbox_item(id).is_some(), "inbox item", id)?;
                self.confirm(PendingAction::CompleteInboxItem(id))
            }
            InboxCommand::ToProject { id } => {
                let project = transitions::convert_to_project(self.store, id)
                    .ok_or_else(|| CliError::NotFound(format!("inbox item {id}")))?;
                writeln!(self.out, "Project created successfully (ID: {})", project.id)?;
                Ok(true)
            }
            InboxCommand::ToTask { id, project, details } => {
                let conversion = TaskConversion::begin(self.store, id)
                    .ok_or_else(|| CliError::NotFound(format!("inbox item {id}")))?;
                let conversion = details.apply_to(conversion);
                match conversion.commit(self.store, project) {
                    Ok(task) => {
                        writeln!(self.out, "Task created successfully (ID: {})", task.id)?;
                        Ok(true)
                    }
                    Err(_) => Err(CliError::NotFound(format!("project {project}"))),
                }
            }
        }
    }

    fn project(&mut self, command: ProjectCommand) -> Result<bool, CliError> {
        match command {
            ProjectCommand::Add { name } => {
                let project = self
                    .store
                    .add_project(&name)
                    .ok_or_else(|| CliError::InvalidInput("name must not be blank".to_string()))?;
                writeln!(self.out, "Project created successfully (ID: {})", project.id)?;
                Ok(true)
            }
            ProjectCommand::List { search, pages } => {
                let mut view = ListView::new(String::new(), self.config.project_page_size);
                view.set_filter(search.unwrap_or_default());
                let projects = query::search_projects(&self.store.projects(), view.filter());
                let pager = paginate(&mut view, pages, projects.len());
                for project in pager.window(&projects) {
                    writeln!(
                        self.out,
                        "#{:<4} {:<30} {}/{} tasks ({}%)",
                        project.id,
                        project.name,
                        project.completed_tasks,
                        project.total_tasks,
                        project.progress_percent()
                    )?;
                }
                self.more_hint(&pager, projects.len())?;
                Ok(false)
            }
            ProjectCommand::Rename { id, name } => {
                if !self.store.rename_project(id, &name) {
                    return Err(missing_or_blank("project", id));
                }
                writeln!(self.out, "Project renamed")?;
                Ok(true)
            }
            ProjectCommand::Delete { id } => {
                self.require(self.store.project(id).is_some(), "project", id)?;
                self.confirm(PendingAction::DeleteProject(id))
            }
            ProjectCommand::Move { id, to, search } => {
                let shown: Vec<ProjectId> = query::search_projects(&self.store.projects(), search.as_deref().unwrap_or(""))
                    .iter()
                    .map(|p| p.id)
                    .collect();
                let from = shown
                    .iter()
                    .position(|&p| p == id)
                    .ok_or_else(|| CliError::NotFound(format!("project {id} in the listed view")))?;
                let to = to.min(shown.len().saturating_sub(1));
                let changed = transitions::drop_project(self.store, &shown, from, to);
                writeln!(self.out, "Reordered projects ({changed} changed)")?;
                Ok(changed > 0)
            }
            ProjectCommand::Complete { project, tasks } => {
                self.require(self.store.project(project).is_some(), "project", project)?;
                self.confirm(PendingAction::CompleteTasks {
                    project_id: project,
                    task_ids: tasks,
                })
            }
        }
    }

    fn task(&mut self, command: TaskCommand) -> Result<bool, CliError> {
        match command {
            TaskCommand::Add { project, title, details } => {
                self.require(self.store.project(project).is_some(), "project", project)?;
                let task = self
                    .store
                    .add_task(project, details.into_details(title))
                    .ok_or_else(|| CliError::InvalidInput("title must not be blank".to_string()))?;
                writeln!(self.out, "Task created successfully (ID: {})", task.id)?;
                Ok(true)
            }
            TaskCommand::List { project, filter, pages } => {
                let today = self.store.clock().today();
                let mut view = ListView::new(TaskFilter::default(), self.config.task_page_size);
                view.set_filter(filter);
                let tasks = query::filter_tasks(&self.store.project_tasks(project), *view.filter(), today);
                let pager = paginate(&mut view, pages, tasks.len());
                for task in pager.window(&tasks) {
                    writeln!(self.out, "{}", format_task(task))?;
                }
                self.more_hint(&pager, tasks.len())?;
                Ok(false)
            }
            TaskCommand::Update {
                id,
                title,
                description,
                clear_description,
                status,
                context,
                clear_context,
                priority,
                clear_priority,
                due,
                clear_due,
                pomodoros,
                pomodoros_done,
            } => {
                let patch = TaskPatch {
                    title,
                    description: clearable(description, clear_description),
                    status,
                    context: clearable(context, clear_context),
                    priority: clearable(priority, clear_priority),
                    due_date: clearable(due, clear_due),
                    pomodoros_planned: pomodoros,
                    pomodoros_done,
                };
                self.require(self.store.task(id).is_some(), "task", id)?;
                let task = self
                    .store
                    .update_task(id, patch)
                    .ok_or_else(|| CliError::InvalidInput("title must not be blank".to_string()))?;
                writeln!(self.out, "{}", format_task(&task))?;
                Ok(true)
            }
            TaskCommand::Toggle { id } => {
                let task = self
                    .store
                    .toggle_task_complete(id)
                    .ok_or_else(|| CliError::NotFound(format!("task {id}")))?;
                writeln!(self.out, "{}", format_task(&task))?;
                Ok(true)
            }
            TaskCommand::Defer { id, days } => {
                self.require(self.store.task(id).is_some(), "task", id)?;
                let task = self
                    .store
                    .defer_task(id, days)
                    .ok_or_else(|| CliError::InvalidInput(format!("cannot defer by {days} days")))?;
                writeln!(self.out, "{}", format_task(&task))?;
                Ok(true)
            }
            TaskCommand::Pomodoro { id, action } => {
                let task = match action {
                    PomodoroAction::Plan => self.store.inc_pomodoro(id),
                    PomodoroAction::Unplan => self.store.dec_pomodoro(id),
                    PomodoroAction::Done => self.store.inc_pomodoro_done(id),
                }
                .ok_or_else(|| CliError::NotFound(format!("task {id}")))?;
                writeln!(self.out, "{}", format_task(&task))?;
                Ok(true)
            }
            TaskCommand::Move {
                project,
                id,
                to,
                filter,
                rank,
            } => {
                if rank {
                    let rank = i64::try_from(to).map_err(|_| CliError::InvalidInput(format!("rank {to} is too large")))?;
                    if !self.store.update_task_order(project, id, rank) {
                        return Err(CliError::NotFound(format!("task {id} in project {project}")));
                    }
                    writeln!(self.out, "Moved task {id} to rank {rank}")?;
                    return Ok(true);
                }
                let today = self.store.clock().today();
                let shown: Vec<TaskId> = query::filter_tasks(&self.store.project_tasks(project), filter, today)
                    .iter()
                    .map(|t| t.id)
                    .collect();
                let from = shown
                    .iter()
                    .position(|&t| t == id)
                    .ok_or_else(|| CliError::NotFound(format!("task {id} in the listed view")))?;
                let to = to.min(shown.len().saturating_sub(1));
                let changed = transitions::drop_task(self.store, project, &shown, from, to);
                writeln!(self.out, "Reordered tasks ({changed} changed)")?;
                Ok(changed > 0)
            }
        }
    }

    fn calendar(&mut self, command: CalendarCommand) -> Result<bool, CliError> {
        match command {
            CalendarCommand::List { from, to } => {
                let entries = self.store.calendar_events(from, to);
                self.print_entries(&entries)?;
                Ok(false)
            }
            CalendarCommand::Day { date } => {
                let date = date.unwrap_or_else(|| self.store.clock().today());
                let entries = self.store.events_for_date(date);
                self.print_entries(&entries)?;
                Ok(false)
            }
            CalendarCommand::Add {
                title,
                date,
                time,
                end_date,
                end_time,
                description,
                location,
                reminder,
            } => {
                let details = EventDetails {
                    description,
                    start_time: time,
                    end_date,
                    end_time,
                    is_all_day: time.is_none(),
                    location,
                    reminder_date: reminder,
                    ..EventDetails::all_day(title, date)
                };
                let event = self.store.add_calendar_event(details).ok_or_else(invalid_event)?;
                writeln!(self.out, "Event created successfully (ID: {})", event.id)?;
                Ok(true)
            }
            CalendarCommand::Update {
                id,
                title,
                description,
                date,
                time,
                end_date,
                end_time,
                all_day,
                location,
                reminder,
                clear_reminder,
            } => {
                let patch = EventPatch {
                    title,
                    description: description.map(Some),
                    start_date: date,
                    start_time: time.map(Some),
                    end_date: end_date.map(Some),
                    end_time: end_time.map(Some),
                    is_all_day: all_day.or(time.map(|_| false)),
                    location: location.map(Some),
                    reminder_date: clearable(reminder, clear_reminder),
                };
                self.require(self.store.calendar_event(id).is_some(), "calendar event", id)?;
                self.store.update_calendar_event(id, patch).ok_or_else(invalid_event)?;
                writeln!(self.out, "Event updated")?;
                Ok(true)
            }
            CalendarCommand::Delete { id } => {
                self.require(self.store.calendar_event(id).is_some(), "calendar event", id)?;
                self.confirm(PendingAction::DeleteEvent(id))
            }
            CalendarCommand::Tickler => {
                let items = self.store.tickler_items();
                if items.is_empty() {
                    writeln!(self.out, "Nothing in the tickler")?;
                }
                for event in items {
                    let reminder = event.reminder_date.map(|d| d.to_string()).unwrap_or_default();
                    writeln!(self.out, "#{:<4} {}  (reminder {}, event {})", event.id, event.title, reminder, event.start_date)?;
                }
                Ok(false)
            }
        }
    }

    fn dashboard(&mut self) -> Result<(), CliError> {
        let now = self.store.now();
        let status = review::review_status(self.db.last_weekly_review()?, now, self.config.review_interval_days);
        if status.due {
            writeln!(self.out, "Weekly review is due. Run `gtd review`.")?;
        }

        writeln!(self.out, "Inbox: {} item(s)", self.store.inbox_items().len())?;
        let stats = query::pomodoro_stats(self.store, now);
        writeln!(self.out, "Pomodoros: {} today, {} this week", stats.today, stats.this_week)?;

        writeln!(self.out, "\nNext actions")?;
        let actions = query::next_actions(self.store);
        for bucket in query::group_by_context(&actions) {
            let label = bucket.context.map_or_else(|| "no context".to_string(), |c| c.to_string());
            writeln!(self.out, "  {label}")?;
            for action in bucket.actions {
                writeln!(self.out, "    {}  [{}]", format_task(&action.task), action.project_name)?;
            }
        }

        let stalled = query::projects_without_next_action(self.store);
        if !stalled.is_empty() {
            writeln!(self.out, "\nProjects without a next action")?;
            for project in stalled {
                writeln!(self.out, "  #{:<4} {}", project.id, project.name)?;
            }
        }
        Ok(())
    }

    fn review(&mut self, done: bool) -> Result<(), CliError> {
        let now = self.store.now();
        if done {
            self.db.record_weekly_review(now)?;
            info!("weekly review recorded");
            writeln!(self.out, "Weekly review recorded")?;
            return Ok(());
        }

        let status = review::review_status(self.db.last_weekly_review()?, now, self.config.review_interval_days);
        match status.days_since {
            Some(days) => writeln!(self.out, "Last review: {days} day(s) ago")?,
            None => writeln!(self.out, "No weekly review recorded yet")?,
        }
        writeln!(self.out, "1. Empty the inbox: {} item(s) left", self.store.inbox_items().len())?;
        writeln!(
            self.out,
            "2. Give every active project a next action: {} without one",
            query::projects_without_next_action(self.store).len()
        )?;
        writeln!(self.out, "3. Go through the tickler: {} item(s)", self.store.tickler_items().len())?;
        let (monday, sunday) = crate::utils::week_window(now.date_naive());
        writeln!(
            self.out,
            "4. Check this week's calendar: {} entr(ies)",
            self.store.calendar_events(Some(monday), Some(sunday)).len()
        )?;
        writeln!(self.out, "Run `gtd review --done` when finished.")?;
        Ok(())
    }

    fn export(&mut self, output: Option<PathBuf>) -> Result<(), CliError> {
        let snapshot = self.store.snapshot();
        let document = ExportDocument {
            exported_at: self.store.now(),
            last_weekly_review: self.db.last_weekly_review()?,
            data: &snapshot,
        };
        let json = serde_json::to_string_pretty(&document)?;
        match output {
            Some(path) => {
                std::fs::write(&path, json)?;
                writeln!(self.out, "Exported to {}", path.display())?;
            }
            None => writeln!(self.out, "{json}")?,
        }
        Ok(())
    }

    /// Run a destructive action through the confirmation gate, asking on
    /// the terminal unless `--yes` was given.
    fn confirm(&mut self, action: PendingAction) -> Result<bool, CliError> {
        let mut gate = Confirmation::default();
        let prompt = format!("Really {}? [y/N] ", action.describe());
        gate.request(action);

        if !self.assume_yes {
            write!(self.out, "{prompt}")?;
            self.out.flush()?;
            let mut answer = String::new();
            self.input.read_line(&mut answer)?;
            if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                gate.cancel();
                writeln!(self.out, "Cancelled")?;
                return Ok(false);
            }
        }

        let changed = gate.confirm(self.store);
        debug!(changed, "confirmed action");
        writeln!(self.out, "{}", if changed { "Done" } else { "Nothing changed" })?;
        Ok(changed)
    }

    fn require(&self, exists: bool, what: &str, id: i64) -> Result<(), CliError> {
        if exists { Ok(()) } else { Err(CliError::NotFound(format!("{what} {id}"))) }
    }

    fn more_hint(&mut self, pager: &Paginator, total: usize) -> Result<(), CliError> {
        if pager.has_more(total) {
            writeln!(self.out, "... {} more (use --pages)", pager.remaining(total))?;
        }
        Ok(())
    }

    fn print_entries(&mut self, entries: &[CalendarEntry]) -> Result<(), CliError> {
        if entries.is_empty() {
            writeln!(self.out, "No calendar entries")?;
        }
        for entry in entries {
            writeln!(self.out, "{}", format_entry(entry))?;
        }
        Ok(())
    }
}

impl TaskArgs {
    fn into_details(self, title: String) -> TaskDetails {
        TaskDetails {
            description: self.description,
            status: self.status.unwrap_or_default(),
            context: self.context,
            priority: self.priority,
            due_date: self.due,
            pomodoros_planned: self.pomodoros,
            ..TaskDetails::titled(title)
        }
    }

    fn apply_to(self, mut conversion: TaskConversion) -> TaskConversion {
        if let Some(description) = self.description {
            conversion = conversion.description(description);
        }
        if let Some(status) = self.status {
            conversion = conversion.status(status);
        }
        if let Some(context) = self.context {
            conversion = conversion.context(context);
        }
        if let Some(priority) = self.priority {
            conversion = conversion.priority(priority);
        }
        if let Some(due) = self.due {
            conversion = conversion.due_date(due);
        }
        conversion.pomodoros(self.pomodoros)
    }
}

/// `Some(None)` clears, `Some(Some(v))` sets, `None` leaves alone.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

/// Load `pages` pages of a freshly filtered view.
fn paginate<F: PartialEq>(view: &mut ListView<F>, pages: usize, total: usize) -> Paginator {
    for _ in 1..pages.max(1) {
        view.load_more(total);
    }
    *view.pages()
}

fn invalid_event() -> CliError {
    CliError::InvalidInput("title must not be blank and the event must not end before it starts".to_string())
}

fn missing_or_blank(what: &str, id: i64) -> CliError {
    CliError::InvalidInput(format!("{what} {id} does not exist or the new title is blank"))
}

pub fn format_task(task: &ProjectTask) -> String {
    let mark = match task.status {
        TaskStatus::Completed => "[x]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Deferred => "[>]",
        TaskStatus::NotStarted => "[ ]",
    };
    let mut line = format!("{mark} #{:<4} {}", task.id, task.title);
    if let Some(context) = task.context {
        line.push_str(&format!(" {context}"));
    }
    if let Some(priority) = task.priority {
        line.push_str(&format!(" !{priority}"));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {due}"));
    }
    if task.pomodoros_planned > 0 || task.pomodoros_done > 0 {
        line.push_str(&format!(" ({}/{} pomodoros)", task.pomodoros_done, task.pomodoros_planned));
    }
    line
}

fn format_entry(entry: &CalendarEntry) -> String {
    match entry {
        CalendarEntry::Event(event) => {
            let when = match (event.is_all_day, event.start_time) {
                (false, Some(time)) => time.format("%H:%M").to_string(),
                _ => "all day".to_string(),
            };
            let until = if event.last_date() != event.start_date {
                format!(" until {}", event.last_date())
            } else {
                String::new()
            };
            let location = event.location.as_deref().map(|l| format!(" @ {l}")).unwrap_or_default();
            format!("{} {:<7} #{:<4} {}{}{}", event.start_date, when, event.id, event.title, until, location)
        }
        CalendarEntry::TaskDue(due) => {
            format!("{} {:<7} task #{} {} ({})", due.date, "due", due.task_id, due.title, due.description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use std::io::Cursor;

    struct Harness {
        store: Store,
        db: Database,
        config: Config,
    }

    impl Harness {
        fn new() -> Self {
            let now = Local.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).single().unwrap();
            Self {
                store: Store::new(FixedClock(now)),
                db: Database::open_in_memory().unwrap(),
                config: Config::default(),
            }
        }

        fn run(&mut self, args: &[&str], stdin: &str) -> (Result<bool, CliError>, String) {
            let cli = Cli::try_parse_from(std::iter::once("gtd").chain(args.iter().copied())).unwrap();
            let mut out = Vec::new();
            let mut input = Cursor::new(stdin.as_bytes().to_vec());
            let result = {
                let mut session = Session {
                    store: &mut self.store,
                    db: &self.db,
                    config: &self.config,
                    out: &mut out,
                    input: &mut input,
                    assume_yes: cli.yes,
                };
                session.run(cli.command.unwrap_or(Commands::Dashboard))
            };
            (result, String::from_utf8(out).unwrap())
        }
    }

    #[test]
    fn capture_joins_words() {
        let mut h = Harness::new();
        let (result, out) = h.run(&["capture", "buy", "oat", "milk"], "");
        assert!(result.unwrap());
        assert!(out.contains("ID: 1"));
        assert_eq!(h.store.inbox_items()[0].title, "buy oat milk");
    }

    #[test]
    fn delete_asks_and_respects_no() {
        let mut h = Harness::new();
        h.run(&["capture", "junk"], "");

        let (result, out) = h.run(&["inbox", "delete", "1"], "n\n");
        assert!(!result.unwrap());
        assert!(out.contains("Cancelled"));
        assert_eq!(h.store.inbox_items().len(), 1);

        let (result, _) = h.run(&["inbox", "delete", "1"], "yes\n");
        assert!(result.unwrap());
        assert!(h.store.inbox_items().is_empty());
    }

    #[test]
    fn yes_flag_skips_prompt() {
        let mut h = Harness::new();
        h.run(&["project", "add", "Garage"], "");
        let (result, out) = h.run(&["--yes", "project", "delete", "1"], "");
        assert!(result.unwrap());
        assert!(!out.contains("Really"));
        assert!(h.store.projects().is_empty());
    }

    #[test]
    fn inbox_to_task_carries_flags() {
        let mut h = Harness::new();
        h.run(&["capture", "call bank"], "");
        h.run(&["project", "add", "Finance"], "");
        let (result, _) = h.run(
            &["inbox", "to-task", "1", "--project", "1", "--context", "@phone", "--due", "2026-10-20"],
            "",
        );
        assert!(result.unwrap());
        let task = h.store.project_tasks(1).remove(0);
        assert_eq!(task.context, Some(Context::Phone));
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 10, 20));
        assert!(h.store.inbox_items().is_empty());
    }

    #[test]
    fn to_task_with_unknown_project_keeps_item() {
        let mut h = Harness::new();
        h.run(&["capture", "call bank"], "");
        let (result, _) = h.run(&["inbox", "to-task", "1", "--project", "7"], "");
        assert!(matches!(result, Err(CliError::NotFound(_))));
        assert_eq!(h.store.inbox_items().len(), 1);
    }

    #[test]
    fn task_move_reorders_listed_view() {
        let mut h = Harness::new();
        h.run(&["project", "add", "P"], "");
        for title in ["a", "b", "c"] {
            h.run(&["task", "add", "1", title], "");
        }
        let (result, _) = h.run(&["task", "move", "1", "3", "0"], "");
        assert!(result.unwrap());
        let titles: Vec<_> = h.store.project_tasks(1).into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn review_done_is_recorded() {
        let mut h = Harness::new();
        let (_, out) = h.run(&["dashboard"], "");
        assert!(out.contains("Weekly review is due"));

        let (result, _) = h.run(&["review", "--done"], "");
        assert!(!result.unwrap());
        let (_, out) = h.run(&["dashboard"], "");
        assert!(!out.contains("Weekly review is due"));
    }

    #[test]
    fn export_is_valid_json() {
        let mut h = Harness::new();
        h.run(&["capture", "x"], "");
        let (_, out) = h.run(&["export"], "");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["inbox_items"][0]["title"], "x");
        assert!(value["last_weekly_review"].is_null());
    }

    #[test]
    fn defer_out_of_range_is_rejected() {
        let mut h = Harness::new();
        h.run(&["project", "add", "P"], "");
        h.run(&["task", "add", "1", "someday"], "");

        let (result, _) = h.run(&["task", "defer", "1", "--days", "100000000"], "");
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
        assert_eq!(h.store.task(1).unwrap().due_date, None);

        let (result, _) = h.run(&["task", "defer", "9"], "");
        assert!(matches!(result, Err(CliError::NotFound(_))));
    }

    #[test]
    fn blank_title_update_changes_nothing() {
        let mut h = Harness::new();
        h.run(&["project", "add", "P"], "");
        h.run(&["task", "add", "1", "keep"], "");

        let (result, _) = h.run(&["task", "update", "1", "--title", " ", "--status", "completed"], "");
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
        let task = h.store.task(1).unwrap();
        assert_eq!((task.title.as_str(), task.status), ("keep", TaskStatus::NotStarted));
    }

    #[test]
    fn backwards_event_is_rejected() {
        let mut h = Harness::new();
        let (result, _) = h.run(
            &["calendar", "add", "Trip", "--date", "2026-10-22", "--end-date", "2026-10-20"],
            "",
        );
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
        assert!(h.store.calendar_events(None, None).is_empty());
    }

    #[test]
    fn task_list_pages() {
        let mut h = Harness::new();
        h.config.task_page_size = 2;
        h.run(&["project", "add", "P"], "");
        for title in ["a", "b", "c"] {
            h.run(&["task", "add", "1", title], "");
        }
        let (_, out) = h.run(&["task", "list", "1"], "");
        assert!(out.contains("1 more"));
        let (_, out) = h.run(&["task", "list", "1", "--pages", "2"], "");
        assert!(!out.contains("more"));
    }
}
