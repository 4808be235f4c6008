//! Ranking of sibling sets: tasks within one project, and all projects.
//!
//! Every sibling carries an integer `order`. New items append at
//! `max(order) + 1`; drag-and-drop recomputes a dense `0..n` sequence.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{OrderUpdate, Project, ProjectTask};

/// Something that carries an id and an optional integer rank.
pub trait Ranked {
    fn rank_id(&self) -> i64;
    fn rank(&self) -> Option<i64>;
    fn set_rank(&mut self, order: i64);
}

impl Ranked for ProjectTask {
    fn rank_id(&self) -> i64 {
        self.id
    }

    fn rank(&self) -> Option<i64> {
        self.order
    }

    fn set_rank(&mut self, order: i64) {
        self.order = Some(order);
    }
}

impl Ranked for Project {
    fn rank_id(&self) -> i64 {
        self.id
    }

    fn rank(&self) -> Option<i64> {
        Some(self.order)
    }

    fn set_rank(&mut self, order: i64) {
        self.order = order;
    }
}

/// Order for an item appended after `items`: `max(existing, -1) + 1`.
pub fn next_order<T: Ranked>(items: &[T]) -> i64 {
    items.iter().filter_map(Ranked::rank).max().unwrap_or(-1) + 1
}

/// Tasks: order ascending, unranked last, then oldest first.
pub fn compare_tasks(a: &ProjectTask, b: &ProjectTask) -> Ordering {
    compare_ranks(a.order, b.order).then_with(|| a.created_at.cmp(&b.created_at))
}

/// Projects: order ascending, then newest first.
pub fn compare_projects(a: &Project, b: &Project) -> Ordering {
    a.order.cmp(&b.order).then_with(|| b.created_at.cmp(&a.created_at))
}

fn compare_ranks(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Give every unranked item a rank after the current maximum, in slice order.
/// Returns how many items were backfilled.
pub fn backfill_missing<T: Ranked>(items: &mut [T]) -> usize {
    let mut next = next_order(items);
    let mut filled = 0;
    for item in items.iter_mut().filter(|item| item.rank().is_none()) {
        item.set_rank(next);
        next += 1;
        filled += 1;
    }
    filled
}

/// Overwrite ranks for the listed ids. Ids not present are ignored.
/// Returns how many items changed.
pub fn apply_order_updates<T: Ranked>(items: &mut [T], updates: &[OrderUpdate]) -> usize {
    let by_id: HashMap<i64, i64> = updates.iter().map(|u| (u.id, u.order)).collect();
    let mut changed = 0;
    for item in items.iter_mut() {
        if let Some(&order) = by_id.get(&item.rank_id()) {
            if item.rank() != Some(order) {
                item.set_rank(order);
                changed += 1;
            }
        }
    }
    changed
}

/// Move one item to `new_order`, shifting the items between its old and new
/// rank by one so the rest keep their relative sequence.
pub fn move_to_order<T: Ranked>(items: &mut [T], id: i64, new_order: i64) -> bool {
    let Some(old_order) = items
        .iter()
        .find(|item| item.rank_id() == id)
        .map(|item| item.rank().unwrap_or(i64::MAX))
    else {
        return false;
    };

    for item in items.iter_mut() {
        if item.rank_id() == id {
            item.set_rank(new_order);
            continue;
        }
        let Some(current) = item.rank() else {
            continue;
        };
        if old_order < new_order && current > old_order && current <= new_order {
            item.set_rank(current - 1);
        } else if old_order > new_order && current >= new_order && current < old_order {
            item.set_rank(current + 1);
        }
    }
    true
}

/// Move the element at `from` to `to` within `sequence`.
pub fn move_index<T>(sequence: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= sequence.len() || to >= sequence.len() {
        return false;
    }
    let item = sequence.remove(from);
    sequence.insert(to, item);
    true
}

/// Plan the order writes for a drag-and-drop.
///
/// `sorted` is the whole sibling collection in its current order and
/// `displayed` the ids the user actually sees (a filtered or paginated
/// slice of it). The dragged item lands next to its new displayed
/// neighbour inside the full collection, which is then renumbered `0..n`.
/// Only ranks that actually change are returned, and dropping an item onto
/// its own position yields nothing.
pub fn plan_drop<T: Ranked>(sorted: &[T], displayed: &[i64], from: usize, to: usize) -> Vec<OrderUpdate> {
    if from == to {
        return Vec::new();
    }
    let mut shown = displayed.to_vec();
    if !move_index(&mut shown, from, to) {
        return Vec::new();
    }
    let dragged = shown[to];

    let mut full: Vec<i64> = sorted.iter().map(Ranked::rank_id).collect();
    let Some(source) = full.iter().position(|&id| id == dragged) else {
        return Vec::new();
    };
    full.remove(source);

    // Land right before the displayed successor; at the bottom of the view,
    // right after the displayed predecessor.
    let target = match shown.get(to + 1) {
        Some(next) => full.iter().position(|id| id == next),
        None => to
            .checked_sub(1)
            .and_then(|prev| full.iter().position(|&id| id == shown[prev]))
            .map(|idx| idx + 1),
    };
    full.insert(target.unwrap_or(source).min(full.len()), dragged);

    let current: HashMap<i64, Option<i64>> = sorted.iter().map(|item| (item.rank_id(), item.rank())).collect();
    full.iter()
        .enumerate()
        .filter_map(|(index, &id)| {
            let order = index as i64;
            (current.get(&id).copied().flatten() != Some(order)).then_some(OrderUpdate { id, order })
        })
        .collect()
}
