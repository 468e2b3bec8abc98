//! Bounded history of accepted records
//!
//! Serves "recent activity" queries. The capacity can be changed at
//! runtime; shrinking evicts the oldest entries immediately.

use crate::core::{LogRecord, ModuleId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of retained entries
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Insertion order across the lifetime of the buffer, starting at 1
    pub sequence: u64,
    pub record: LogRecord,
}

impl HistoryEntry {
    pub fn module(&self) -> Option<&ModuleId> {
        self.record.module.as_ref()
    }
}

struct Ring {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Ring {
    fn trim(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..excess);
        excess
    }
}

/// Capped FIFO of accepted records, oldest evicted first.
///
/// # Example
///
/// ```
/// use rust_logging_service::core::{LogLevel, LogRecord};
/// use rust_logging_service::service::HistoryBuffer;
///
/// let history = HistoryBuffer::with_capacity(2);
/// for message in ["a", "b", "c"] {
///     history.push(LogRecord::new("app", LogLevel::Info, message));
/// }
///
/// let messages: Vec<_> = history.entries().into_iter().map(|e| e.record.message).collect();
/// assert_eq!(messages, vec!["b", "c"]);
/// ```
pub struct HistoryBuffer {
    ring: Mutex<Ring>,
    next_sequence: AtomicU64,
    evicted: AtomicU64,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
                capacity,
            }),
            next_sequence: AtomicU64::new(1),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity
    }

    /// Change the capacity. Zero disables retention.
    pub fn set_capacity(&self, capacity: usize) {
        let mut ring = self.ring.lock();
        ring.capacity = capacity;
        let evicted = ring.trim();
        self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn push(&self, record: LogRecord) {
        let mut ring = self.ring.lock();
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        if ring.capacity == 0 {
            self.evicted.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if ring.entries.len() >= ring.capacity {
            ring.entries.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        ring.entries.push_back(HistoryEntry { sequence, record });
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.ring.lock().entries.iter().cloned().collect()
    }

    /// Up to `count` most recent entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        let ring = self.ring.lock();
        let skip = ring.entries.len().saturating_sub(count);
        ring.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().entries.is_empty()
    }

    /// Entries pushed out by capacity, including those never retained
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.ring.lock().entries.clear();
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
