//! Console appender implementation

use crate::core::{Appender, LogLevel, LogRecord, OutputFormat, Result, TimestampFormat};
#[cfg(feature = "console")]
use colored::Colorize;

/// Where console output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    /// Error and Fatal to stderr, everything else to stdout
    #[default]
    Split,
    /// Everything to stderr
    Stderr,
}

pub struct ConsoleAppender {
    name: String,
    use_colors: bool,
    target: ConsoleTarget,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            name: "console".to_string(),
            use_colors: cfg!(feature = "console"),
            target: ConsoleTarget::Split,
            timestamp_format: TimestampFormat::default(),
            output_format: OutputFormat::default(),
        }
    }

    /// Plain stderr console used for diagnostics before a backend exists
    pub fn diagnostic() -> Self {
        Self::new()
            .with_name("fallback")
            .with_colors(false)
            .with_target(ConsoleTarget::Stderr)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Colors are only honored when the `console` feature is enabled
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors && cfg!(feature = "console");
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: ConsoleTarget) -> Self {
        self.target = target;
        self
    }

    /// Set the output format for this appender
    ///
    /// # Example
    ///
    /// ```
    /// use rust_logging_service::appenders::ConsoleAppender;
    /// use rust_logging_service::OutputFormat;
    ///
    /// let appender = ConsoleAppender::new()
    ///     .with_output_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    fn render(&self, record: &LogRecord) -> String {
        let line = self.output_format.format(record, &self.timestamp_format);
        if !self.use_colors || self.output_format != OutputFormat::Text {
            return line;
        }
        self.colorize(record.level, line)
    }

    #[cfg(feature = "console")]
    fn colorize(&self, level: LogLevel, line: String) -> String {
        let padded = format!("[{:5}]", level.to_str());
        let colored = padded.color(level.color_code()).to_string();
        line.replacen(&padded, &colored, 1)
    }

    #[cfg(not(feature = "console"))]
    fn colorize(&self, _level: LogLevel, line: String) -> String {
        line
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let output = self.render(record);

        match (self.target, record.level) {
            (ConsoleTarget::Stderr, _) | (_, LogLevel::Error | LogLevel::Fatal) => {
                eprintln!("{}", output)
            }
            _ => println!("{}", output),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
