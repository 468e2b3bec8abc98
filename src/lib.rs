//! # Rust Logging Service
//!
//! A logging facade that bridges application code to a reconfigurable
//! logging engine.
//!
//! ## Features
//!
//! - **Stable Handles**: Logger handles survive reconfiguration and work
//!   before any configuration exists
//! - **Atomic Reconfiguration**: New engine contexts are built and started
//!   before they replace the active one; a failed build changes nothing
//! - **History and Events**: Accepted records are kept in a bounded history
//!   buffer and posted asynchronously to event handlers
//! - **Legacy Levels**: Numeric severity codes map onto [`LogLevel`]
//!
//! ## Example
//!
//! ```
//! use rust_logging_service::prelude::*;
//! use std::sync::Arc;
//!
//! let service = RoutingService::builder()
//!     .status(Arc::new(StatusLogger::quiet()))
//!     .build()
//!     .unwrap();
//!
//! service.updated(Some(
//!     &ConfigProperties::new()
//!         .with("engine.rootLogger.level", "debug")
//!         .with("logging.history.size", "10"),
//! ));
//!
//! let logger = service.get_logger("com.acme.app");
//! logger.debug("visible after reconfiguration");
//! assert_eq!(service.history().capacity(), 10);
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod engine;
pub mod macros;
pub mod service;

pub mod prelude {
    pub use crate::appenders::{ConsoleAppender, FileAppender, JsonAppender, OutputSink, SinkRegistry};
    pub use crate::config::{ConfigProperties, ConfigurationNotifier, EngineConfig};
    pub use crate::core::{
        Appender, DiagnosticContext, LogContext, LogLevel, LogRecord, LoggerError, ModuleId,
        OutputFormat, Result, RoutingMetrics, StatusLogger, StatusSink, TimestampFormat,
    };
    pub use crate::engine::EngineMode;
    pub use crate::service::{
        CategoryRegistry, LogEvent, LogEventHandler, LoggerHandle, ModuleLogService,
        RoutingService,
    };
}

pub use appenders::{ConsoleAppender, FileAppender, JsonAppender};
pub use config::{ConfigProperties, ConfigurationController, EngineConfig};
pub use core::{
    Appender, ContextGuard, DiagnosticContext, FieldValue, LogContext, LogLevel, LogRecord,
    LoggerError, ModuleId, OutputFormat, Result, RoutingMetrics, TimestampFormat,
};
pub use engine::{EngineContext, EngineMode};
pub use service::{
    CategoryRegistry, HistoryBuffer, LogEvent, LogEventHandler, LoggerHandle, ModuleLogService,
    RoutingService,
};
