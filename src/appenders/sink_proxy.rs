//! Fan-out to dynamically registered output sinks
//!
//! Output sinks are registered in a [`SinkDirectory`] under a logical name
//! by parties outside the logging configuration (bridges into other
//! systems, test probes, ...). A configuration refers to them by name with
//! a `sink` appender, which forwards each record through a [`SinkProxy`] to
//! every sink currently registered under that name.
//!
//! The proxy caches the matching sinks and re-queries the directory only
//! when the directory's change counter has moved since the last dispatch.

use crate::core::{Appender, LogRecord, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Destination for records published through a [`SinkDirectory`]
pub trait OutputSink: Send + Sync {
    fn do_append(&self, record: &LogRecord);
}

/// Registry of live output sinks
///
/// Only [`OutputSink`] objects can be stored, so lookups filter on the
/// logical name alone.
pub trait SinkDirectory: Send + Sync {
    /// All live sinks registered under `name`
    fn matching(&self, name: &str) -> Vec<Arc<dyn OutputSink>>;

    /// Monotonic counter bumped on every registration change
    fn change_count(&self) -> u64;
}

struct SinkEntry {
    id: u64,
    name: String,
    sink: Arc<dyn OutputSink>,
}

/// In-process [`SinkDirectory`]
#[derive(Default)]
pub struct SinkRegistry {
    entries: RwLock<Vec<SinkEntry>>,
    change_count: AtomicU64,
    next_id: AtomicU64,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink` under `name`, returning its registration id
    pub fn register(&self, name: impl Into<String>, sink: Arc<dyn OutputSink>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.write().push(SinkEntry {
            id,
            name: name.into(),
            sink,
        });
        self.change_count.fetch_add(1, Ordering::Release);
        id
    }

    /// Remove a registration; `false` if the id is unknown
    pub fn unregister(&self, id: u64) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        drop(entries);

        if removed {
            self.change_count.fetch_add(1, Ordering::Release);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SinkDirectory for SinkRegistry {
    fn matching(&self, name: &str) -> Vec<Arc<dyn OutputSink>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| Arc::clone(&entry.sink))
            .collect()
    }

    fn change_count(&self) -> u64 {
        self.change_count.load(Ordering::Acquire)
    }
}

struct SinkSnapshot {
    /// Directory change count the snapshot was taken at; `None` before the
    /// first dispatch
    count: Option<u64>,
    sinks: Arc<[Arc<dyn OutputSink>]>,
}

/// Forwards records to every sink registered under one logical name
pub struct SinkProxy {
    name: String,
    directory: Arc<dyn SinkDirectory>,
    snapshot: RwLock<SinkSnapshot>,
    refreshes: AtomicU64,
}

impl SinkProxy {
    pub fn new(directory: Arc<dyn SinkDirectory>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory,
            snapshot: RwLock::new(SinkSnapshot {
                count: None,
                sinks: Arc::from(Vec::new()),
            }),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of times the directory has been re-queried
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Deliver `record` to all current sinks; a no-op when none exist
    pub fn dispatch(&self, record: &LogRecord) {
        for sink in self.current_sinks().iter() {
            sink.do_append(record);
        }
    }

    fn current_sinks(&self) -> Arc<[Arc<dyn OutputSink>]> {
        let count = self.directory.change_count();
        {
            let snapshot = self.snapshot.read();
            if snapshot.count == Some(count) {
                return Arc::clone(&snapshot.sinks);
            }
        }

        let mut snapshot = self.snapshot.write();
        if snapshot.count != Some(count) {
            snapshot.sinks = Arc::from(self.directory.matching(&self.name));
            snapshot.count = Some(count);
            self.refreshes.fetch_add(1, Ordering::Relaxed);
        }
        Arc::clone(&snapshot.sinks)
    }
}

/// Engine appender backed by a [`SinkProxy`]
pub struct SinkAppender {
    appender_name: String,
    proxy: SinkProxy,
}

impl SinkAppender {
    pub fn new(
        appender_name: impl Into<String>,
        directory: Arc<dyn SinkDirectory>,
        sink_name: impl Into<String>,
    ) -> Self {
        Self {
            appender_name: appender_name.into(),
            proxy: SinkProxy::new(directory, sink_name),
        }
    }

    pub fn proxy(&self) -> &SinkProxy {
        &self.proxy
    }
}

impl Appender for SinkAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        self.proxy.dispatch(record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.appender_name
    }
}
