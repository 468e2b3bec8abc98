//! Logging service: handles, registry, routing, history and events

pub mod events;
pub mod fallback;
pub mod handle;
pub mod history;
pub mod registry;
pub mod routing;
pub mod scoped;

pub use events::{
    topic_for, AsyncEventPoster, LogEvent, LogEventHandler, DEFAULT_EVENT_QUEUE,
    EVENT_TOPIC_PREFIX,
};
pub use fallback::{FallbackLogger, DEFAULT_FALLBACK_LEVEL};
pub use handle::{LogBackend, LogCall, LoggerHandle};
pub use history::{HistoryBuffer, HistoryEntry, DEFAULT_HISTORY_CAPACITY};
pub use registry::CategoryRegistry;
pub use routing::{RoutingService, RoutingServiceBuilder, SERVICE_QUALIFIER};
pub use scoped::{ModuleLogService, MODULE_QUALIFIER};
