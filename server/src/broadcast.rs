//! Pending unsolicited updates, one mailbox per connected session.
//!
//! Clients only ever receive data in reply to a request, so updates that
//! every player should see are parked here and handed out on each session's
//! next `get_state` poll.

use log::{debug, warn};
use parques_shared::Response;
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

#[derive(Debug)]
pub struct BroadcastCache {
    mailboxes: HashMap<String, VecDeque<Response>>,
    capacity: usize,
}

impl Default for BroadcastCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}

impl BroadcastCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            mailboxes: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Opens a mailbox for a newly connected session.
    pub fn register(&mut self, handle: &str) {
        self.mailboxes.entry(handle.to_string()).or_default();
    }

    /// Drops a session's mailbox along with anything still queued in it.
    pub fn unregister(&mut self, handle: &str) -> bool {
        self.mailboxes.remove(handle).is_some()
    }

    /// Queues a copy of `update` for every session. Returns how many got it.
    pub fn publish(&mut self, update: Response) -> usize {
        for (handle, mailbox) in self.mailboxes.iter_mut() {
            if mailbox.len() == self.capacity {
                warn!("Update mailbox for {} is full, dropping oldest update", handle);
                mailbox.pop_front();
            }
            mailbox.push_back(update.clone());
        }
        debug!("Queued update for {} sessions", self.mailboxes.len());
        self.mailboxes.len()
    }

    /// Takes the oldest pending update for `handle`.
    ///
    /// Updates are snapshots from the moment they were published, so one
    /// taken now may predate later changes, e.g. a lobby view queued just
    /// before the game started.
    pub fn take(&mut self, handle: &str) -> Option<Response> {
        self.mailboxes.get_mut(handle)?.pop_front()
    }

    pub fn pending(&self, handle: &str) -> usize {
        self.mailboxes.get(handle).map_or(0, VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }
}
