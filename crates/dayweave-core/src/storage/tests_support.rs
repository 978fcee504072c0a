//! In-memory [`ItemStore`] for unit tests, with injectable write failures.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use super::{ItemStore, WriteOutcome};
use crate::timeline::Item;

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<Vec<Item>>,
    failing: HashSet<String>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: RefCell::new(items),
            ..Self::default()
        }
    }

    /// Every write touching `id` fails.
    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn get(&self, id: &str) -> Option<Item> {
        self.items.borrow().iter().find(|i| i.id == id).cloned()
    }

    /// Write attempts so far, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn write(&self, id: &str, apply: impl FnOnce(&mut Item)) -> Result<WriteOutcome, String> {
        self.writes.set(self.writes.get() + 1);
        if self.failing.contains(id) {
            return Err(format!("simulated write failure for {id}"));
        }
        match self.items.borrow_mut().iter_mut().find(|i| i.id == id) {
            Some(item) => {
                apply(item);
                Ok(WriteOutcome::Applied)
            }
            None => Ok(WriteOutcome::NotFound),
        }
    }
}

impl ItemStore for MemoryStore {
    type Error = String;

    fn active_items(&self, user_id: &str) -> Result<Vec<Item>, String> {
        let mut items: Vec<Item> = self
            .items
            .borrow()
            .iter()
            .filter(|i| i.user_id == user_id && !i.is_completed)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.ordering_id == 0, i.ordering_id));
        Ok(items)
    }

    fn mark_completed(&self, id: &str) -> Result<WriteOutcome, String> {
        self.write(id, |item| item.is_completed = true)
    }

    fn set_ordering_id(&self, id: &str, ordering_id: u32) -> Result<WriteOutcome, String> {
        self.write(id, |item| item.ordering_id = ordering_id)
    }
}
