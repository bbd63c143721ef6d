//! Bounded alert store
//!
//! Keeps the most recent alerts newest-first. Capacity is fixed at construction;
//! once full, every prepend evicts the oldest record.

use std::collections::VecDeque;
use std::sync::RwLock;

use crate::alerts::types::{AlertCounts, AlertRecord};

/// Default number of alerts retained.
pub const DEFAULT_ALERT_CAPACITY: usize = 50;

/// Fixed-capacity, newest-first collection of alert records.
pub struct AlertStore {
    entries: RwLock<VecDeque<AlertRecord>>,
    capacity: usize,
}

impl AlertStore {
    /// Creates a store holding at most [`DEFAULT_ALERT_CAPACITY`] records.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALERT_CAPACITY)
    }

    /// Creates a store with the given capacity (clamped to at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts a record at the front, evicting the oldest past capacity.
    pub fn prepend(&self, record: AlertRecord) {
        let counts = {
            let mut entries = self.write();
            entries.push_front(record);
            entries.truncate(self.capacity);
            Self::count(&entries)
        };
        publish_gauges(counts);
    }

    /// Replaces the contents with a server-confirmed list (newest first).
    ///
    /// Used when a full re-fetch supersedes the pushed history.
    pub fn replace_all(&self, records: Vec<AlertRecord>) {
        let counts = {
            let mut entries = self.write();
            entries.clear();
            entries.extend(records.into_iter().take(self.capacity));
            Self::count(&entries)
        };
        publish_gauges(counts);
    }

    /// Returns all records, newest first.
    pub fn snapshot(&self) -> Vec<AlertRecord> {
        self.read().iter().cloned().collect()
    }

    /// Returns the most recent record, if any.
    pub fn latest(&self) -> Option<AlertRecord> {
        self.read().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.read().iter().filter(|a| a.is_active()).count()
    }

    pub fn critical_count(&self) -> usize {
        self.read().iter().filter(|a| a.is_critical()).count()
    }

    /// Total, active and critical counts taken under a single lock.
    pub fn counts(&self) -> AlertCounts {
        Self::count(&self.read())
    }

    fn count(entries: &VecDeque<AlertRecord>) -> AlertCounts {
        AlertCounts {
            total: entries.len(),
            active: entries.iter().filter(|a| a.is_active()).count(),
            critical: entries.iter().filter(|a| a.is_critical()).count(),
        }
    }

    // A poisoned lock only means a reader panicked mid-clone; the deque itself is intact.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, VecDeque<AlertRecord>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, VecDeque<AlertRecord>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

fn publish_gauges(counts: AlertCounts) {
    metrics::gauge!(crate::metrics::ALERTS_STORED).set(counts.total as f64);
    metrics::gauge!(crate::metrics::ALERTS_ACTIVE).set(counts.active as f64);
    metrics::gauge!(crate::metrics::ALERTS_CRITICAL).set(counts.critical as f64);
}
