//! Interest Index
//!
//! Tracks which requester devices are waiting on which not-yet-stable feed.
//! Entries grow as more devices ask about the same pending feed and are
//! drained in one shot when the ledger reports the feed stable. Set
//! semantics: a device registered twice is notified once.

use crate::types::{DeviceAddress, FeedName};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct InterestIndex {
    waiting: Mutex<HashMap<FeedName, HashSet<DeviceAddress>>>,
}

impl InterestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `device` is waiting on `feed_name`. Returns false when the
    /// device was already registered.
    pub fn register(&self, feed_name: &str, device: &str) -> bool {
        self.waiting
            .lock()
            .entry(feed_name.to_string())
            .or_default()
            .insert(device.to_string())
    }

    /// Remove and return every distinct device waiting on `feed_name`.
    pub fn drain(&self, feed_name: &str) -> Option<Vec<DeviceAddress>> {
        self.waiting
            .lock()
            .remove(feed_name)
            .map(|devices| devices.into_iter().collect())
    }

    /// Whether anybody is waiting on `feed_name`.
    pub fn has_waiters(&self, feed_name: &str) -> bool {
        self.waiting.lock().contains_key(feed_name)
    }

    /// Number of feeds with at least one waiter.
    pub fn pending_feeds(&self) -> usize {
        self.waiting.lock().len()
    }
}
