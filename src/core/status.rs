//! Self-diagnostics of the logging service
//!
//! Nothing inside the service is allowed to fail a caller's log call, so
//! internal problems (bad configuration, appender failures, dropped
//! events) are reported to a [`StatusSink`] instead.

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default number of status entries retained by [`StatusLogger`]
pub const DEFAULT_STATUS_CAPACITY: usize = 256;

/// Receiver of the service's own diagnostic messages
pub trait StatusSink: Send + Sync {
    fn record(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(LogLevel::Error, message);
    }
}

#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Bounded in-memory status log that echoes serious entries to stderr.
///
/// # Example
///
/// ```
/// use rust_logging_service::core::{LogLevel, StatusLogger, StatusSink};
///
/// let status = StatusLogger::quiet();
/// status.warn("configuration file missing");
/// assert_eq!(status.count(LogLevel::Warn), 1);
/// ```
#[derive(Debug)]
pub struct StatusLogger {
    entries: Mutex<VecDeque<StatusEntry>>,
    capacity: usize,
    echo_level: Option<LogLevel>,
}

impl StatusLogger {
    /// Echo warnings and errors to stderr
    pub fn new() -> Self {
        Self::with_echo_level(Some(LogLevel::Warn))
    }

    /// Record only, never echo
    pub fn quiet() -> Self {
        Self::with_echo_level(None)
    }

    pub fn with_echo_level(echo_level: Option<LogLevel>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(DEFAULT_STATUS_CAPACITY)),
            capacity: DEFAULT_STATUS_CAPACITY,
            echo_level,
        }
    }

    pub fn entries(&self) -> Vec<StatusEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Number of retained entries at exactly `level`
    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.lock().iter().filter(|e| e.level == level).count()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for StatusLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for StatusLogger {
    fn record(&self, level: LogLevel, message: &str) {
        if self.echo_level.is_some_and(|threshold| level >= threshold) {
            let label = match level {
                LogLevel::Fatal | LogLevel::Error => "ERROR",
                LogLevel::Warn => "WARNING",
                LogLevel::Info => "INFO",
                LogLevel::Debug | LogLevel::Trace => "DEBUG",
            };
            eprintln!("[LOGGER {}] {}", label, message);
        }

        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(StatusEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_level() {
        let status = StatusLogger::quiet();
        status.info("configured");
        status.warn("missing file");
        status.warn("async unavailable");
        status.error("bad level");

        assert_eq!(status.count(LogLevel::Info), 1);
        assert_eq!(status.count(LogLevel::Warn), 2);
        assert_eq!(status.count(LogLevel::Error), 1);
        assert!(status.contains(LogLevel::Warn, "async"));
    }

    #[test]
    fn test_bounded() {
        let status = StatusLogger::quiet();
        for i in 0..DEFAULT_STATUS_CAPACITY + 10 {
            status.info(&format!("entry {}", i));
        }

        let entries = status.entries();
        assert_eq!(entries.len(), DEFAULT_STATUS_CAPACITY);
        assert_eq!(entries[0].message, "entry 10");
    }
}
