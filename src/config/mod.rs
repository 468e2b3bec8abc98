//! Configuration: snapshots, engine documents, sources and the controller

pub mod controller;
pub mod document;
pub mod notifier;
pub mod properties;
pub mod source;

pub use controller::{ConfigurationController, ControllerBuilder, ControllerState};
pub use document::{
    AppenderConfig, AppenderRef, ConfigFormat, EngineConfig, LoggerConfig, RootConfig,
    DEFAULT_APPENDER_NAME,
};
pub use notifier::{ConfigurationNotifier, NoopNotifier, RecordingNotifier};
pub use properties::{
    ConfigProperties, ASYNC_KEY, CONFIG_FILE_KEY, ENGINE_PREFIX, HISTORY_SIZE_KEY,
    HISTORY_SIZE_LEGACY_KEY,
};
pub use source::{ConfigurationSource, DocumentSource};
