use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type InboxItemId = i64;
pub type ProjectId = i64;
pub type TaskId = i64;
pub type EventId = i64;

/// Upper bound for both planned and completed pomodoros on a task.
pub const MAX_POMODOROS: u8 = 4;

/// Clamp a raw pomodoro count into `[0, MAX_POMODOROS]`.
pub fn clamp_pomodoros(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_POMODOROS)) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxItem {
    pub id: InboxItemId,
    pub title: String,
    pub created_at: DateTime<Local>,
    pub updated_at: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub created_at: DateTime<Local>,
    pub order: i64,
}

impl Project {
    /// Completion percentage, rounded to the nearest whole number.
    pub fn progress_percent(&self) -> u32 {
        if self.total_tasks == 0 {
            return 0;
        }
        (f64::from(self.completed_tasks) * 100.0 / f64::from(self.total_tasks)).round() as u32
    }

    /// A project is active while it has tasks and not all of them are done.
    pub fn is_active(&self) -> bool {
        self.total_tasks > 0 && self.completed_tasks < self.total_tasks
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Deferred,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Deferred => "deferred",
        }
    }

    /// Statuses that make a task eligible as a project's next action.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::NotStarted | Self::InProgress)
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "deferred" => Ok(Self::Deferred),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where or how a task can be done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    Computer,
    Phone,
    Home,
    Office,
}

impl Context {
    pub const ALL: [Context; 4] = [Self::Computer, Self::Phone, Self::Home, Self::Office];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Computer => "computer",
            Self::Phone => "phone",
            Self::Home => "home",
            Self::Office => "office",
        }
    }
}

impl FromStr for Context {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('@') {
            "computer" => Ok(Self::Computer),
            "phone" => Ok(Self::Phone),
            "home" => Ok(Self::Home),
            "office" => Ok(Self::Office),
            other => Err(format!("unknown context: {other}")),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTask {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub context: Option<Context>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub pomodoros_planned: u8,
    #[serde(default)]
    pub pomodoros_done: u8,
    pub created_at: DateTime<Local>,
    /// Rank within the owning project. Legacy rows may lack one; reads backfill it.
    pub order: Option<i64>,
    pub parent_task_id: Option<TaskId>,
}

impl ProjectTask {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Fields supplied when a task is created, either directly or from an inbox item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDetails {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub context: Option<Context>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub pomodoros_planned: u8,
    pub pomodoros_done: u8,
    pub parent_task_id: Option<TaskId>,
}

impl TaskDetails {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a task. `None` leaves the field untouched; for clearable
/// fields the inner `None` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub context: Option<Option<Context>>,
    pub priority: Option<Option<Priority>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub pomodoros_planned: Option<i64>,
    pub pomodoros_done: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: bool,
    pub location: Option<String>,
    /// Tickler trigger: the event resurfaces for review from this date on.
    pub reminder_date: Option<NaiveDate>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl CalendarEvent {
    /// Last day the event covers; single-day events end where they start.
    pub fn last_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: bool,
    pub location: Option<String>,
    pub reminder_date: Option<NaiveDate>,
}

impl EventDetails {
    pub fn all_day(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            start_date: date,
            start_time: None,
            end_date: None,
            end_time: None,
            is_all_day: true,
            location: None,
            reminder_date: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<Option<NaiveTime>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub end_time: Option<Option<NaiveTime>>,
    pub is_all_day: Option<bool>,
    pub location: Option<Option<String>>,
    pub reminder_date: Option<Option<NaiveDate>>,
}

/// Calendar entry derived from an open task's due date. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDueEntry {
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Local>,
}

/// What a calendar query yields: stored events plus task-derived entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarEntry {
    Event(CalendarEvent),
    TaskDue(TaskDueEntry),
}

impl CalendarEntry {
    pub fn title(&self) -> &str {
        match self {
            Self::Event(event) => &event.title,
            Self::TaskDue(entry) => &entry.title,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        match self {
            Self::Event(event) => event.start_date,
            Self::TaskDue(entry) => entry.date,
        }
    }

    pub fn last_date(&self) -> NaiveDate {
        match self {
            Self::Event(event) => event.last_date(),
            Self::TaskDue(entry) => entry.date,
        }
    }

    pub fn is_all_day(&self) -> bool {
        match self {
            Self::Event(event) => event.is_all_day,
            Self::TaskDue(_) => true,
        }
    }

    /// Only stored events can be edited or deleted.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    pub fn event_id(&self) -> Option<EventId> {
        match self {
            Self::Event(event) => Some(event.id),
            Self::TaskDue(_) => None,
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Self::Event(_) => None,
            Self::TaskDue(entry) => Some(entry.task_id),
        }
    }
}

/// One `{id, order}` pair of a bulk order write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: i64,
    pub order: i64,
}
