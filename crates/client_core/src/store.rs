//! Local copy of the memory collection.
//!
//! The store is a plain ordered collection keyed by [`MemoryId`]; it never
//! talks to the network. Order is display order as delivered by the last
//! list or search response.

use std::collections::HashSet;

use shared::domain::MemoryId;
use tracing::warn;

use crate::types::Item;

#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Vec<Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `items` in order. Repeated ids keep their first occurrence.
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = Item>) {
        let mut seen: HashSet<MemoryId> = HashSet::new();
        let mut next: Vec<Item> = Vec::new();
        for item in items {
            if !seen.insert(item.id.clone()) {
                warn!(memory_id = %item.id, "dropping duplicate memory from response");
                continue;
            }
            next.push(item);
        }
        self.items = next;
    }

    /// Overwrites the entry with the same id in place, or appends.
    pub fn upsert(&mut self, item: Item) {
        match self.position(&item.id) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    /// Returns whether an entry was removed.
    pub fn remove(&mut self, id: &MemoryId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: &MemoryId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &MemoryId) -> bool {
        self.position(id).is_some()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, id: &MemoryId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
