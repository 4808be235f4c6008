use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewStatus {
    pub due: bool,
    /// Whole days since the last review; `None` if there never was one.
    pub days_since: Option<i64>,
}

/// The weekly review is due when none has happened yet or when at least
/// `interval_days` whole days have passed since the last one.
pub fn review_status(last: Option<DateTime<Local>>, now: DateTime<Local>, interval_days: i64) -> ReviewStatus {
    match last {
        None => ReviewStatus {
            due: true,
            days_since: None,
        },
        Some(last) => {
            let days = (now - last).num_days();
            ReviewStatus {
                due: days >= interval_days,
                days_since: Some(days),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).single().unwrap()
    }

    #[test]
    fn never_reviewed_is_due() {
        assert_eq!(
            review_status(None, now(), 7),
            ReviewStatus {
                due: true,
                days_since: None
            }
        );
    }

    #[test]
    fn due_after_full_interval() {
        let almost = now() - Duration::days(7) + Duration::hours(1);
        assert!(!review_status(Some(almost), now(), 7).due);
        assert_eq!(review_status(Some(almost), now(), 7).days_since, Some(6));

        let week = now() - Duration::days(7);
        assert!(review_status(Some(week), now(), 7).due);
    }
}
