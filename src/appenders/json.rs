//! JSON-lines appender archiving complete records

use crate::core::{Appender, LogRecord, LoggerError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes each record, including cause chain, module identity and
/// qualifier, as one JSON object per line.
pub struct JsonAppender {
    name: String,
    writer: BufWriter<File>,
}

impl JsonAppender {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LoggerError::file_appender(path.display().to_string(), e.to_string()))?;

        Ok(Self {
            name: "json".to_string(),
            writer: BufWriter::new(file),
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Appender for JsonAppender {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
