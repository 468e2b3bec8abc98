//! Appender implementations

pub mod console;
pub mod file;
pub mod json;
pub mod sink_proxy;

pub use console::{ConsoleAppender, ConsoleTarget};
pub use file::FileAppender;
pub use json::JsonAppender;
pub use sink_proxy::{OutputSink, SinkAppender, SinkDirectory, SinkProxy, SinkRegistry};

pub use crate::core::Appender;
