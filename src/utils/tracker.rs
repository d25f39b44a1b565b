//! Epoch counter for "seen during this traversal" checks
//!
//! Instead of clearing a visited flag on every entity before a traversal,
//! each entity stores the epoch at which it was last touched. Advancing the
//! tracker makes every stored stamp stale in O(1).
//!
//! Epochs are drawn from a single process-wide counter, so two trackers
//! never hand out the same value and an entity can be shared between
//! several indexes without stamps from one being mistaken for the other.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Zero is reserved for "never stamped"
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

/// Current traversal epoch
#[derive(Debug)]
pub struct Tracker {
    epoch: u64,
}

impl Tracker {
    pub fn new() -> Self {
        Tracker { epoch: next_epoch() }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a new traversal, invalidating every stamp taken so far
    pub fn advance(&mut self) -> u64 {
        self.epoch = next_epoch();
        self.epoch
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-entity stamp, mutable through a shared reference
#[derive(Debug, Default, Clone)]
pub struct TrackerStamp {
    epoch: Cell<u64>,
}

impl TrackerStamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_current(&self, tracker: &Tracker) -> bool {
        self.epoch.get() == tracker.epoch()
    }

    /// Stamp with the tracker's epoch. Returns true on the first sighting
    /// during this epoch.
    pub fn mark(&self, tracker: &Tracker) -> bool {
        if self.is_current(tracker) {
            return false;
        }
        self.epoch.set(tracker.epoch());
        true
    }

    pub fn reset(&self) {
        self.epoch.set(0);
    }
}
