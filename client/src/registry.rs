use std::collections::HashMap;

use kernel::aggregate::{self, OverallStatus, Tally};
use kernel::{ItemId, UploadFile, UploadItem};
use tokio_util::sync::CancellationToken;

/// Identifies one dispatch of one item.
///
/// A ticket stays valid until the registry is cleared or the item is
/// settled, canceled or dispatched again. Transport callbacks carrying an
/// invalid ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub(crate) generation: u64,
    pub(crate) attempt: u64,
    pub(crate) id: ItemId,
}

struct InFlight {
    attempt: u64,
    cancel: CancellationToken,
}

/// Items of one upload session in insertion order.
#[derive(Default)]
pub(crate) struct Registry {
    generation: u64,
    attempts: u64,
    items: Vec<UploadItem>,
    index: HashMap<ItemId, usize>,
    in_flight: HashMap<ItemId, InFlight>,
}

impl Registry {
    pub(crate) fn push(&mut self, file: UploadFile) -> ItemId {
        let item = UploadItem::new(file);
        let id = item.id();
        self.index.insert(id, self.items.len());
        self.items.push(item);
        id
    }

    pub(crate) fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub(crate) fn get(&self, id: ItemId) -> Option<&UploadItem> {
        self.index.get(&id).and_then(|&ix| self.items.get(ix))
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut UploadItem> {
        self.index.get(&id).and_then(|&ix| self.items.get_mut(ix))
    }

    pub(crate) fn idle_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .filter(|item| item.status() == kernel::UploadStatus::Idle)
            .map(UploadItem::id)
            .collect()
    }

    /// Registers a new dispatch of `id`, replacing any previous one.
    pub(crate) fn track(&mut self, id: ItemId) -> (Ticket, CancellationToken) {
        self.attempts += 1;
        let cancel = CancellationToken::new();
        let previous = self.in_flight.insert(
            id,
            InFlight {
                attempt: self.attempts,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        let ticket = Ticket {
            generation: self.generation,
            attempt: self.attempts,
            id,
        };
        (ticket, cancel)
    }

    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        ticket.generation == self.generation
            && self
                .in_flight
                .get(&ticket.id)
                .is_some_and(|f| f.attempt == ticket.attempt)
    }

    /// Item addressed by a live ticket.
    pub(crate) fn current_mut(&mut self, ticket: Ticket) -> Option<&mut UploadItem> {
        if self.is_current(ticket) {
            self.get_mut(ticket.id)
        } else {
            None
        }
    }

    /// Ends the dispatch behind `ticket` and hands out its item.
    pub(crate) fn settle(&mut self, ticket: Ticket) -> Option<&mut UploadItem> {
        if !self.is_current(ticket) {
            return None;
        }
        self.in_flight.remove(&ticket.id);
        self.get_mut(ticket.id)
    }

    /// Forgets the dispatch of `id` and returns its cancellation token.
    pub(crate) fn forget(&mut self, id: ItemId) -> Option<CancellationToken> {
        self.in_flight.remove(&id).map(|f| f.cancel)
    }

    /// Drops every item and starts a new generation. Returns the tokens of
    /// all dispatches still running.
    pub(crate) fn clear(&mut self) -> Vec<CancellationToken> {
        self.generation += 1;
        self.items.clear();
        self.index.clear();
        self.in_flight.drain().map(|(_, f)| f.cancel).collect()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.generation,
            items: self.items.clone(),
        }
    }
}

/// Point-in-time copy of a session, published after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    generation: u64,
    items: Vec<UploadItem>,
}

impl Snapshot {
    /// Incremented by every `clear`.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn progress(&self) -> f64 {
        aggregate::overall_progress(&self.items)
    }

    #[must_use]
    pub fn status(&self) -> OverallStatus {
        aggregate::overall_status(&self.items)
    }

    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        aggregate::is_uploaded(&self.items)
    }

    #[must_use]
    pub fn is_uploading(&self) -> bool {
        aggregate::is_uploading(&self.items)
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        aggregate::has_error(&self.items)
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        Tally::from_items(&self.items)
    }
}
