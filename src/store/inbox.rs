use tracing::debug;

use super::{IdCounters, Store, clean_title};
use crate::models::{InboxItem, InboxItemId};

impl Store {
    /// Capture a new inbox item. Blank titles are ignored; duplicates are not.
    pub fn add_inbox_item(&mut self, title: &str) -> Option<InboxItem> {
        let title = clean_title(title)?;
        let now = self.now();
        let item = InboxItem {
            id: IdCounters::next(&mut self.ids.inbox),
            title,
            created_at: now,
            updated_at: Some(now),
        };
        debug!(id = item.id, "captured inbox item");
        self.inbox.push(item.clone());
        Some(item)
    }

    /// Remove an item by id, returning it if it was there.
    pub fn remove_inbox_item(&mut self, id: InboxItemId) -> Option<InboxItem> {
        let index = self.inbox.iter().position(|item| item.id == id)?;
        debug!(id, "removed inbox item");
        Some(self.inbox.remove(index))
    }

    pub fn update_inbox_item(&mut self, id: InboxItemId, title: &str) -> bool {
        let Some(title) = clean_title(title) else {
            return false;
        };
        let now = self.now();
        match self.inbox.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.title = title;
                item.updated_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// All inbox items, newest first.
    pub fn inbox_items(&self) -> Vec<InboxItem> {
        let mut items = self.inbox.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        items
    }

    pub fn inbox_item(&self, id: InboxItemId) -> Option<InboxItem> {
        self.inbox.iter().find(|item| item.id == id).cloned()
    }
}
