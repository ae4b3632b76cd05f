//! Log-line deduplication
//!
//! The status endpoint re-sends a cumulative log tail on every poll, so
//! the poll channel must remember which raw lines it has already emitted.
//! One deduplicator belongs to exactly one channel instance and dies with
//! it; a new job starts with an empty set.

use std::collections::HashSet;

/// Tracks raw log messages already surfaced for one job.
#[derive(Debug, Default)]
pub struct EventDeduplicator {
    seen: HashSet<String>,
}

impl EventDeduplicator {
    /// Creates an empty deduplicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records the message on first sight, false for
    /// every later occurrence of the same raw message.
    pub fn should_emit(&mut self, raw_message: &str) -> bool {
        if self.seen.contains(raw_message) {
            return false;
        }
        self.seen.insert(raw_message.to_string());
        true
    }

    /// Number of distinct messages seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True if no message has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
