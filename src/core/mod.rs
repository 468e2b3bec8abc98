//! Core types shared by every layer: levels, records, appenders, errors

pub mod appender;
pub mod error;
pub mod log_context;
pub mod log_level;
pub mod log_record;
pub mod metrics;
pub mod output_format;
pub mod status;
pub mod timestamp;

pub use appender::Appender;
pub use error::{LoggerError, Result};
pub use log_context::{ContextGuard, DiagnosticContext, FieldValue, LogContext};
pub use log_level::{LogLevel, LEGACY_DEBUG, LEGACY_ERROR, LEGACY_INFO, LEGACY_WARNING};
pub use log_record::{ErrorCause, LogRecord, ModuleId, DEFAULT_QUALIFIER};
pub use metrics::RoutingMetrics;
pub use output_format::OutputFormat;
pub use status::{StatusEntry, StatusLogger, StatusSink, DEFAULT_STATUS_CAPACITY};
pub use timestamp::TimestampFormat;
