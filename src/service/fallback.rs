//! Always-on diagnostic logger used while no backend is attached

use crate::appenders::ConsoleAppender;
use crate::core::{Appender, LogLevel, LogRecord};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Default threshold of the fallback path
pub const DEFAULT_FALLBACK_LEVEL: LogLevel = LogLevel::Debug;

/// Writes records directly to an appender (plain stderr by default).
///
/// Used for calls made before any configuration completed or after the
/// routing service shut down, so they are never dropped silently.
pub struct FallbackLogger {
    appender: Mutex<Box<dyn Appender>>,
    level: AtomicU8,
    delivered: AtomicU64,
}

impl FallbackLogger {
    pub fn new() -> Self {
        Self::with_appender(Box::new(ConsoleAppender::diagnostic()))
    }

    pub fn with_appender(appender: Box<dyn Appender>) -> Self {
        Self {
            appender: Mutex::new(appender),
            level: AtomicU8::new(DEFAULT_FALLBACK_LEVEL as u8),
            delivered: AtomicU64::new(0),
        }
    }

    pub fn level(&self) -> LogLevel {
        let raw = self.level.load(Ordering::Relaxed);
        LogLevel::ALL
            .into_iter()
            .find(|level| *level as u8 == raw)
            .unwrap_or(DEFAULT_FALLBACK_LEVEL)
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    /// Records written so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Write `record` if it passes the fallback threshold. Appender errors
    /// are swallowed; there is nowhere left to report them.
    pub fn log(&self, record: &LogRecord) {
        if !self.is_enabled(record.level) {
            return;
        }
        let mut appender = self.appender.lock();
        if appender.append(record).and_then(|_| appender.flush()).is_ok() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for FallbackLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Result;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Appender for Capture {
        fn append(&mut self, record: &LogRecord) -> Result<()> {
            self.0.lock().push(record.message.clone());
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    #[test]
    fn test_threshold() {
        let capture = Capture::default();
        let fallback = FallbackLogger::with_appender(Box::new(capture.clone()));

        fallback.log(&LogRecord::new("boot", LogLevel::Trace, "hidden"));
        fallback.log(&LogRecord::new("boot", LogLevel::Debug, "shown"));
        assert_eq!(*capture.0.lock(), vec!["shown".to_string()]);

        fallback.set_level(LogLevel::Error);
        assert_eq!(fallback.level(), LogLevel::Error);
        fallback.log(&LogRecord::new("boot", LogLevel::Warn, "hidden"));
        assert_eq!(fallback.delivered(), 1);
    }
}
