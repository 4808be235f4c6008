pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod models;
pub mod ordering;
pub mod query;
pub mod review;
pub mod store;
pub mod transitions;
pub mod utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use database::Database;
pub use models::{CalendarEntry, CalendarEvent, InboxItem, Project, ProjectTask, TaskStatus};
pub use store::{Store, StoreSnapshot};
pub use utils::Profile;
