//! Configuration outcome notification

use crate::core::LoggerError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives exactly one call per reconfiguration attempt that reached the
/// build stage
pub trait ConfigurationNotifier: Send + Sync {
    fn configuration_done(&self);
    fn configuration_error(&self, error: &LoggerError);
}

/// Discards notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ConfigurationNotifier for NoopNotifier {
    fn configuration_done(&self) {}
    fn configuration_error(&self, _error: &LoggerError) {}
}

/// Counts notifications and keeps the last error message
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    done: AtomicU64,
    errors: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done_count(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl ConfigurationNotifier for RecordingNotifier {
    fn configuration_done(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    fn configuration_error(&self, error: &LoggerError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(error.to_string());
    }
}
