//! Key-deduplicated, insertion-ordered processing queue.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;

/// A filesystem change relevant to the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A file or directory was created, written or renamed into place.
    Changed(PathBuf),
    /// A file or directory was deleted or renamed away.
    Removed(PathBuf),
}

/// Pending paths plus the time of the most recent enqueue.
///
/// Re-adding a queued path refreshes its timestamp but keeps its position.
#[derive(Debug, Default)]
pub struct ProcessingQueue {
    entries: IndexMap<PathBuf, Instant>,
    last_event: Option<Instant>,
}

impl ProcessingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `path` at time `now`. Returns `true` if it was not queued yet.
    pub fn add(&mut self, path: PathBuf, now: Instant) -> bool {
        self.last_event = Some(now);
        match self.entries.get_mut(&path) {
            Some(seen) => {
                *seen = now;
                false
            }
            None => {
                self.entries.insert(path, now);
                true
            }
        }
    }

    /// Drop `path` from the queue, keeping the order of the rest.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.entries.shift_remove(path).is_some()
    }

    /// Take the oldest entry.
    pub fn pop_front(&mut self) -> Option<PathBuf> {
        self.entries.shift_remove_index(0).map(|(path, _)| path)
    }

    /// Whether entries are pending and nothing arrived for `quiescence`.
    pub fn should_drain(&self, now: Instant, quiescence: Duration) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        match self.last_event {
            Some(last) => now.saturating_duration_since(last) >= quiescence,
            None => true,
        }
    }

    /// Time of the last event for a queued path.
    pub fn last_seen(&self, path: &Path) -> Option<Instant> {
        self.entries.get(path).copied()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
