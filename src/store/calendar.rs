use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{IdCounters, Store, clean_title};
use crate::models::{CalendarEntry, CalendarEvent, EventDetails, EventId, EventPatch, TaskDueEntry};

impl Store {
    /// Store a new event. Does nothing when the title is blank or the end
    /// date precedes the start date.
    pub fn add_calendar_event(&mut self, details: EventDetails) -> Option<CalendarEvent> {
        let title = clean_title(&details.title)?;
        if ends_before_start(details.start_date, details.end_date) {
            return None;
        }
        let now = self.now();
        let event = CalendarEvent {
            id: IdCounters::next(&mut self.ids.event),
            title,
            description: details.description,
            start_date: details.start_date,
            start_time: if details.is_all_day { None } else { details.start_time },
            end_date: details.end_date,
            end_time: if details.is_all_day { None } else { details.end_time },
            is_all_day: details.is_all_day,
            location: details.location,
            reminder_date: details.reminder_date,
            created_at: now,
            updated_at: now,
        };
        debug!(id = event.id, date = %event.start_date, "added calendar event");
        self.events.push(event.clone());
        Some(event)
    }

    /// Apply a partial update. The event is left untouched when the patch
    /// carries a blank title or would end the event before it starts.
    pub fn update_calendar_event(&mut self, id: EventId, patch: EventPatch) -> Option<CalendarEvent> {
        let title = match patch.title.as_deref().map(clean_title) {
            Some(None) => return None,
            title => title.flatten(),
        };
        let now = self.now();
        let stored = self.events.iter_mut().find(|e| e.id == id)?;
        let mut event = stored.clone();

        if let Some(title) = title {
            event.title = title;
        }
        if let Some(description) = patch.description {
            event.description = description;
        }
        if let Some(start_date) = patch.start_date {
            event.start_date = start_date;
        }
        if let Some(start_time) = patch.start_time {
            event.start_time = start_time;
        }
        if let Some(end_date) = patch.end_date {
            event.end_date = end_date;
        }
        if let Some(end_time) = patch.end_time {
            event.end_time = end_time;
        }
        if let Some(is_all_day) = patch.is_all_day {
            event.is_all_day = is_all_day;
        }
        if let Some(location) = patch.location {
            event.location = location;
        }
        if let Some(reminder_date) = patch.reminder_date {
            event.reminder_date = reminder_date;
        }
        if event.is_all_day {
            event.start_time = None;
            event.end_time = None;
        }
        if ends_before_start(event.start_date, event.end_date) {
            return None;
        }
        event.updated_at = now;
        *stored = event.clone();
        Some(event)
    }

    pub fn delete_calendar_event(&mut self, id: EventId) -> Option<CalendarEvent> {
        let index = self.events.iter().position(|e| e.id == id)?;
        debug!(id, "deleted calendar event");
        Some(self.events.remove(index))
    }

    /// Delete whatever a calendar query returned. Task-derived entries are
    /// refused; they disappear when the task is completed or loses its due date.
    pub fn delete_calendar_entry(&mut self, entry: &CalendarEntry) -> bool {
        match entry {
            CalendarEntry::Event(event) => self.delete_calendar_event(event.id).is_some(),
            CalendarEntry::TaskDue(due) => {
                warn!(task_id = due.task_id, "refusing to delete a task-derived calendar entry");
                false
            }
        }
    }

    pub fn calendar_event(&self, id: EventId) -> Option<CalendarEvent> {
        self.events.iter().find(|e| e.id == id).cloned()
    }

    /// Stored events overlapping `[start, end]` plus one all-day entry per
    /// open task due in that range, ordered by start date. A missing bound
    /// leaves that side of the range open.
    pub fn calendar_events(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<CalendarEntry> {
        let after_start = |date: NaiveDate| start.is_none_or(|s| date >= s);
        let before_end = |date: NaiveDate| end.is_none_or(|e| date <= e);

        let mut entries: Vec<CalendarEntry> = self
            .events
            .iter()
            .filter(|e| before_end(e.start_date) && after_start(e.last_date()))
            .cloned()
            .map(CalendarEntry::Event)
            .collect();

        for project in self.projects() {
            for task in self.project_tasks(project.id) {
                let Some(due) = task.due_date else {
                    continue;
                };
                if task.is_completed() || !after_start(due) || !before_end(due) {
                    continue;
                }
                entries.push(CalendarEntry::TaskDue(TaskDueEntry {
                    task_id: task.id,
                    project_id: project.id,
                    title: task.title,
                    description: format!("From project: {}", project.name),
                    date: due,
                    created_at: task.created_at,
                }));
            }
        }

        entries.sort_by_key(CalendarEntry::start_date);
        entries
    }

    pub fn events_for_date(&self, date: NaiveDate) -> Vec<CalendarEntry> {
        self.calendar_events(Some(date), Some(date))
    }

    /// Stored events whose reminder date has arrived or passed.
    pub fn tickler_items(&self) -> Vec<CalendarEvent> {
        let today = self.clock.today();
        self.events
            .iter()
            .filter(|e| e.reminder_date.is_some_and(|r| r <= today))
            .cloned()
            .collect()
    }
}

fn ends_before_start(start: NaiveDate, end: Option<NaiveDate>) -> bool {
    let backwards = end.is_some_and(|end| end < start);
    if backwards {
        warn!(%start, end = ?end, "event ends before it starts");
    }
    backwards
}

#[cfg(test)]
mod tests {
    use crate::clock::FixedClock;
    use crate::models::{CalendarEntry, EventDetails, EventPatch, TaskDetails, TaskStatus};
    use crate::store::Store;
    use chrono::{Local, NaiveDate, NaiveTime, TimeZone};

    fn store() -> Store {
        Store::new(FixedClock(Local.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).single().unwrap()))
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn range_uses_inclusive_overlap() {
        let mut store = store();
        let mut trip = EventDetails::all_day("Offsite", date(18));
        trip.end_date = Some(date(20));
        store.add_calendar_event(trip);
        store.add_calendar_event(EventDetails::all_day("Dentist", date(25)));

        let titles: Vec<_> = store
            .calendar_events(Some(date(20)), Some(date(24)))
            .iter()
            .map(|e| e.title().to_string())
            .collect();
        assert_eq!(titles, vec!["Offsite"]);
        assert_eq!(store.calendar_events(Some(date(25)), Some(date(25))).len(), 1);
        assert_eq!(store.calendar_events(None, None).len(), 2);
    }

    #[test]
    fn open_tasks_with_due_dates_become_entries() {
        let mut store = store();
        let project = store.add_project("Launch").unwrap();
        let due = store
            .add_task(
                project.id,
                TaskDetails {
                    due_date: Some(date(20)),
                    ..TaskDetails::titled("Ship it")
                },
            )
            .unwrap();
        store.add_task(project.id, TaskDetails::titled("No date")).unwrap();
        store.add_calendar_event(EventDetails::all_day("Standup", date(21)));

        let entries = store.calendar_events(Some(date(19)), Some(date(21)));
        assert_eq!(entries.len(), 2);
        match &entries[0] {
            CalendarEntry::TaskDue(entry) => {
                assert_eq!(entry.task_id, due.id);
                assert_eq!(entry.description, "From project: Launch");
            }
            other => panic!("expected task entry, got {other:?}"),
        }
        assert!(entries[0].is_all_day());
        assert!(!entries[0].is_editable());

        store.set_task_status(due.id, TaskStatus::Completed);
        assert_eq!(store.calendar_events(Some(date(19)), Some(date(21))).len(), 1);
    }

    #[test]
    fn task_entries_cannot_be_deleted() {
        let mut store = store();
        let project = store.add_project("p").unwrap();
        store
            .add_task(
                project.id,
                TaskDetails {
                    due_date: Some(date(19)),
                    ..TaskDetails::titled("due")
                },
            )
            .unwrap();
        let entry = store.events_for_date(date(19)).remove(0);
        assert!(!store.delete_calendar_entry(&entry));
        assert_eq!(store.events_for_date(date(19)).len(), 1);
    }

    #[test]
    fn update_and_delete_real_events() {
        let mut store = store();
        let mut details = EventDetails::all_day("Review", date(22));
        details.is_all_day = false;
        details.start_time = NaiveTime::from_hms_opt(14, 0, 0);
        let event = store.add_calendar_event(details).unwrap();

        let updated = store
            .update_calendar_event(
                event.id,
                EventPatch {
                    is_all_day: Some(true),
                    location: Some(Some("Room A".into())),
                    ..EventPatch::default()
                },
            )
            .unwrap();
        assert!(updated.is_all_day);
        assert_eq!(updated.start_time, None);
        assert_eq!(updated.location.as_deref(), Some("Room A"));

        assert!(store.update_calendar_event(99, EventPatch::default()).is_none());
        assert!(store.delete_calendar_event(event.id).is_some());
        assert!(store.delete_calendar_event(event.id).is_none());
    }

    #[test]
    fn events_cannot_end_before_they_start() {
        let mut store = store();
        let mut backwards = EventDetails::all_day("Backwards", date(22));
        backwards.end_date = Some(date(20));
        assert!(store.add_calendar_event(backwards).is_none());
        assert!(store.calendar_events(None, None).is_empty());

        let event = store.add_calendar_event(EventDetails::all_day("Trip", date(22))).unwrap();
        assert_eq!(event.id, 1);
        let rejected = EventPatch {
            title: Some("Shorter trip".into()),
            end_date: Some(Some(date(21))),
            ..EventPatch::default()
        };
        assert!(store.update_calendar_event(event.id, rejected).is_none());
        assert_eq!(store.calendar_event(event.id).unwrap(), event);

        let blank = EventPatch {
            title: Some(" ".into()),
            location: Some(Some("Lisbon".into())),
            ..EventPatch::default()
        };
        assert!(store.update_calendar_event(event.id, blank).is_none());
        assert_eq!(store.calendar_event(event.id).unwrap(), event);

        let moved = EventPatch {
            start_date: Some(date(20)),
            end_date: Some(Some(date(21))),
            ..EventPatch::default()
        };
        let updated = store.update_calendar_event(event.id, moved).unwrap();
        assert_eq!(store.calendar_events(Some(date(21)), Some(date(21))).len(), 1);
        assert_eq!(updated.last_date(), date(21));
    }

    #[test]
    fn tickler_includes_due_and_overdue_reminders() {
        let mut store = store();
        for (title, reminder) in [("past", 1), ("today", 19), ("future", 30)] {
            let mut details = EventDetails::all_day(title, date(30));
            details.reminder_date = Some(date(reminder));
            store.add_calendar_event(details);
        }
        store.add_calendar_event(EventDetails::all_day("plain", date(2)));

        let titles: Vec<_> = store.tickler_items().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["past", "today"]);
    }
}
