use chrono::{Local, TimeZone};
use gtdesk::models::{MAX_POMODOROS, TaskDetails, TaskStatus};
use gtdesk::query::{Paginator, TaskFilter, filter_tasks};
use gtdesk::transitions;
use gtdesk::{Clock, FixedClock, Store};
use proptest::prelude::*;

fn store() -> Store {
    Store::new(FixedClock(Local.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).single().unwrap()))
}

#[derive(Debug, Clone)]
enum Op {
    Capture,
    RemoveInbox(usize),
    AddProject,
    DeleteProject(usize),
    AddTask(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Capture),
        (0usize..8).prop_map(Op::RemoveInbox),
        Just(Op::AddProject),
        (0usize..8).prop_map(Op::DeleteProject),
        (0usize..8).prop_map(Op::AddTask),
    ]
}

#[derive(Debug, Clone, Copy)]
enum Pomodoro {
    Plan,
    Unplan,
    Done,
}

fn pomodoro() -> impl Strategy<Value = Pomodoro> {
    prop_oneof![Just(Pomodoro::Plan), Just(Pomodoro::Unplan), Just(Pomodoro::Done)]
}

fn status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::NotStarted),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Deferred),
    ]
}

proptest! {
    #[test]
    fn new_ids_exceed_existing(ops in prop::collection::vec(op(), 1..60)) {
        let mut store = store();
        let mut seen_inbox = 0;
        let mut seen_project = 0;
        let mut seen_task = 0;

        for op in ops {
            match op {
                Op::Capture => {
                    let item = store.add_inbox_item("x").unwrap();
                    prop_assert!(item.id > seen_inbox);
                    seen_inbox = item.id;
                }
                Op::RemoveInbox(pick) => {
                    let items = store.inbox_items();
                    if let Some(item) = items.get(pick) {
                        store.remove_inbox_item(item.id);
                    }
                }
                Op::AddProject => {
                    let project = store.add_project("p").unwrap();
                    prop_assert!(project.id > seen_project);
                    seen_project = project.id;
                }
                Op::DeleteProject(pick) => {
                    let projects = store.projects();
                    if let Some(project) = projects.get(pick) {
                        store.delete_project(project.id);
                    }
                }
                Op::AddTask(pick) => {
                    let projects = store.projects();
                    if let Some(project) = projects.get(pick) {
                        let task = store.add_task(project.id, TaskDetails::titled("t")).unwrap();
                        prop_assert!(task.id > seen_task);
                        seen_task = task.id;
                    }
                }
            }
        }
    }

    #[test]
    fn dropping_in_place_changes_nothing(count in 1usize..10, at in 0usize..10) {
        let mut store = store();
        let project = store.add_project("p").unwrap();
        for i in 0..count {
            store.add_task(project.id, TaskDetails::titled(format!("t{i}")));
        }
        let before = store.project_tasks(project.id);
        let ids: Vec<_> = before.iter().map(|t| t.id).collect();
        let at = at.min(count - 1);

        prop_assert_eq!(transitions::drop_task(&mut store, project.id, &ids, at, at), 0);
        prop_assert_eq!(store.project_tasks(project.id), before);
    }

    #[test]
    fn completed_count_matches_after_bulk_complete(
        statuses in prop::collection::vec(status(), 1..12),
        pick in prop::collection::vec(any::<bool>(), 12),
    ) {
        let mut store = store();
        let project = store.add_project("p").unwrap();
        let ids: Vec<_> = statuses
            .iter()
            .map(|_| store.add_task(project.id, TaskDetails::titled("t")).unwrap().id)
            .collect();
        for (id, status) in ids.iter().zip(&statuses) {
            store.set_task_status(*id, *status);
        }
        let selected: Vec<_> = ids.iter().zip(&pick).filter(|(_, p)| **p).map(|(id, _)| *id).collect();
        store.complete_tasks(project.id, &selected);

        let completed = store.project_tasks(project.id).iter().filter(|t| t.is_completed()).count();
        prop_assert_eq!(store.project(project.id).unwrap().completed_tasks as usize, completed);
    }

    #[test]
    fn pomodoros_stay_within_bounds(
        start_planned in 0u8..10,
        start_done in 0u8..10,
        steps in prop::collection::vec(pomodoro(), 0..40),
    ) {
        let mut store = store();
        let project = store.add_project("p").unwrap();
        let task = store
            .add_task(
                project.id,
                TaskDetails {
                    pomodoros_planned: start_planned,
                    pomodoros_done: start_done,
                    ..TaskDetails::titled("focus")
                },
            )
            .unwrap();

        for step in steps {
            let updated = match step {
                Pomodoro::Plan => store.inc_pomodoro(task.id),
                Pomodoro::Unplan => store.dec_pomodoro(task.id),
                Pomodoro::Done => store.inc_pomodoro_done(task.id),
            }
            .unwrap();
            prop_assert!(updated.pomodoros_planned <= MAX_POMODOROS);
            prop_assert!(updated.pomodoros_done <= MAX_POMODOROS);
        }
    }

    #[test]
    fn filtered_pages_show_the_right_slice(
        statuses in prop::collection::vec(status(), 0..40),
        page in 1usize..12,
        loads in 0usize..6,
    ) {
        let mut store = store();
        let project = store.add_project("p").unwrap();
        for status in &statuses {
            store.add_task(
                project.id,
                TaskDetails {
                    status: *status,
                    ..TaskDetails::titled("t")
                },
            );
        }
        let filtered = filter_tasks(&store.project_tasks(project.id), TaskFilter::NoDue, store.clock().today());
        let mut pages = Paginator::new(page);
        for _ in 0..loads {
            pages.load_more(filtered.len());
        }

        prop_assert_eq!(pages.window(&filtered).len(), pages.displayed_count().min(filtered.len()));
        prop_assert_eq!(pages.has_more(filtered.len()), pages.displayed_count() < filtered.len());
        prop_assert!(pages.window(&filtered).iter().all(|t| !t.is_completed()));
    }
}
