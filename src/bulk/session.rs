use std::collections::HashSet;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::browser::document::Document;
use crate::bulk::queue::{QueueEntry, WorkQueue};
use crate::timeline::eligibility::{Eligibility, is_eligible};
use crate::timeline::item::{Item, ItemId};
use crate::timeline::locator::locate_items;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Running,
}

/// What the controller's single work slot is doing.
///
/// Anything other than `Waiting` makes a scheduler tick a no-op, so at most
/// one refill or single-item action is in flight at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Waiting,
    Refilling { attempt: u32 },
    Processing { id: ItemId, since: Instant },
}

impl Activity {
    pub fn is_busy(&self) -> bool {
        !matches!(self, Activity::Waiting)
    }

    /// True while the single-item action for `id` is in flight.
    pub fn is_processing(&self, id: &ItemId) -> bool {
        matches!(self, Activity::Processing { id: current, .. } if current == id)
    }
}

/// Ids attempted during the current session. Insert-only.
#[derive(Debug, Default)]
pub struct HandledSet {
    ids: HashSet<ItemId>,
}

impl HandledSet {
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// All per-session bookkeeping, owned exclusively by the bulk controller.
#[derive(Debug)]
pub struct SessionState {
    pub mode: Mode,
    pub processed: u32,
    pub failed: u32,
    pub started_at: Option<Instant>,
    pub queue: WorkQueue,
    pub handled: HandledSet,
    pub activity: Activity,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: Mode::Idle,
            processed: 0,
            failed: 0,
            started_at: None,
            queue: WorkQueue::new(),
            handled: HandledSet::default(),
            activity: Activity::Waiting,
        }
    }
}

impl SessionState {
    /// Fresh state for a new session. The handled set is only ever reset here.
    pub fn begin(now: Instant) -> Self {
        Self {
            mode: Mode::Running,
            started_at: Some(now),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.mode == Mode::Running
    }

    /// Queue `item` if it passes the eligibility filter.
    pub fn enqueue(&mut self, item: &Item, identity: Option<&str>) -> Eligibility {
        let verdict = is_eligible(item, self, identity);
        if let Eligibility::Ineligible(reason) = verdict {
            trace!(id = %item.id, reason, "item not queued");
            return verdict;
        }

        match QueueEntry::from_item(item) {
            Some(entry) => {
                self.queue.push(entry);
                Eligibility::Eligible
            }
            None => Eligibility::Ineligible("no_reference"),
        }
    }

    /// Re-read the page and queue every eligible item. Returns how many
    /// entries were added; calling it again adds nothing new.
    pub fn populate(&mut self, document: &dyn Document, identity: Option<&str>) -> usize {
        let before = self.queue.len();
        for item in locate_items(document) {
            self.enqueue(&item, identity);
        }
        let added = self.queue.len() - before;
        debug!(added, queued = self.queue.len(), "populated work queue");
        added
    }
}
