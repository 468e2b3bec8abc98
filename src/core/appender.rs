//! Appender trait for log output destinations

use super::{error::Result, log_record::LogRecord};

pub trait Appender: Send + Sync {
    fn append(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;

    /// Release resources when the owning engine context stops
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}
