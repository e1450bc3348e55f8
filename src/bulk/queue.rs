use std::collections::{HashSet, VecDeque};

use tokio::time::Instant;

use crate::browser::document::ElementHandle;
use crate::timeline::item::{Item, ItemId, StatusReference};

/// One item waiting for the bulk controller.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: ItemId,
    pub reference: StatusReference,
    pub element: ElementHandle,
    pub enqueued_at: Instant,
}

impl QueueEntry {
    /// `None` when the item has no reference; such items cannot be queued.
    pub fn from_item(item: &Item) -> Option<Self> {
        Some(Self {
            id: item.id.clone(),
            reference: item.reference.clone()?,
            element: item.element.clone(),
            enqueued_at: Instant::now(),
        })
    }
}

/// FIFO backlog with at most one entry per id.
#[derive(Debug, Default)]
pub struct WorkQueue {
    entries: VecDeque<QueueEntry>,
    ids: HashSet<ItemId>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless an entry with the same id is already waiting.
    pub fn push(&mut self, entry: QueueEntry) -> bool {
        if !self.ids.insert(entry.id.clone()) {
            return false;
        }
        self.entries.push_back(entry);
        true
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        let entry = self.entries.pop_front()?;
        self.ids.remove(&entry.id);
        Some(entry)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }
}
