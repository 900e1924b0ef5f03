//! Bounded activity log for the live ticker.
//!
//! Entries are inserted at the front; once the store holds more than its
//! capacity, the oldest entry is dropped from the back.

use std::collections::VecDeque;

use charge_types::LogEntry;

/// Default number of retained entries.
pub const LOG_CAP: usize = 50;

/// Fixed-capacity, newest-first log buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStore {
    entries: VecDeque<LogEntry>,
    cap: usize,
}

impl LogStore {
    /// Create an empty store holding at most `cap` entries (minimum 1).
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Insert `entry` as the newest, evicting the oldest past capacity.
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.cap);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Owned copy of the entries, newest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// The newest entry.
    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(LOG_CAP)
    }
}
