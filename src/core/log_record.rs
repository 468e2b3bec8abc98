//! Log record structure

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::error::Error;
use std::fmt;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Caller-facing qualifier used when the caller does not supply one
pub const DEFAULT_QUALIFIER: &str = "rust_logging_service::LoggerHandle";

/// Identity of the application module a record originates from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId {
    pub id: u64,
    pub symbolic_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ModuleId {
    pub fn new(id: u64, symbolic_name: impl Into<String>) -> Self {
        Self {
            id,
            symbolic_name: symbolic_name.into(),
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} [{}] {}", self.symbolic_name, self.id, v),
            None => write!(f, "{} [{}]", self.symbolic_name, self.id),
        }
    }
}

/// Owned, cloneable rendering of an error and its source chain.
///
/// Records are copied to several consumers, so the live error value is
/// flattened once at acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCause {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl ErrorCause {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sources: Vec::new(),
        }
    }

    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut next = err.source();
        while let Some(source) = next {
            sources.push(source.to_string());
            next = source.source();
        }
        Self {
            message: err.to_string(),
            sources,
        }
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for source in &self.sources {
            write!(f, ": caused by: {}", source)?;
        }
        Ok(())
    }
}

/// One accepted log record. Immutable once handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Channel name; empty for the root channel
    pub channel: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<ErrorCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleId>,
    pub qualifier: String,
    pub thread_id: String,
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
}

impl LogRecord {
    /// Replace newlines, carriage returns and tabs with escape sequences so
    /// a message cannot forge additional log lines.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(channel: impl Into<String>, level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            channel: channel.into(),
            message: Self::sanitize_message(message.as_ref()),
            cause: None,
            module: None,
            qualifier: DEFAULT_QUALIFIER.to_string(),
            thread_id: current_thread_id(),
            thread_name: current_thread_name(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: Option<ErrorCause>) -> Self {
        self.cause = cause;
        self
    }

    #[must_use]
    pub fn with_module(mut self, module: Option<ModuleId>) -> Self {
        self.module = module;
        self
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Channel name as shown in output, `root` for the root channel
    pub fn display_channel(&self) -> &str {
        if self.channel.is_empty() {
            "root"
        } else {
            &self.channel
        }
    }

    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}
