use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    /// Selected solely by the --dev CLI flag
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev { Self::Dev } else { Self::Prod }
    }

    fn app_name(self) -> &'static str {
        match self {
            Self::Dev => "gtdesk-dev",
            Self::Prod => "gtdesk",
        }
    }
}

/// Get the configuration directory path for the given profile
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "gtdesk", profile.app_name()).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path for the given profile
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "gtdesk", profile.app_name()).map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Parse a wall-clock time, `HH:MM` or `HH:MM:SS`
pub fn parse_time(time_str: &str) -> Result<NaiveTime, chrono::ParseError> {
    let time_str = time_str.trim();
    NaiveTime::parse_from_str(time_str, "%H:%M").or_else(|_| NaiveTime::parse_from_str(time_str, "%H:%M:%S"))
}

/// Monday through Sunday of the week containing `day`.
pub fn week_window(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_window_runs_monday_to_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let (start, end) = week_window(sunday);
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(end, sunday);
        assert_eq!(week_window(start), (start, end));
    }

    #[test]
    fn parse_time_accepts_seconds() {
        assert_eq!(parse_time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(parse_time("17:05:10").unwrap(), NaiveTime::from_hms_opt(17, 5, 10).unwrap());
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn expand_path_leaves_plain_paths() {
        assert_eq!(expand_path("/tmp/gtd.db"), PathBuf::from("/tmp/gtd.db"));
    }
}
