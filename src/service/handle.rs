//! Logger handles
//!
//! A handle names one channel and carries the caller-facing qualifier and
//! optional module identity stamped on its records. It holds no engine
//! state: every call looks up the attached backend, so a handle obtained
//! before a reconfiguration, or before any backend existed, follows the
//! current configuration without being re-acquired.

use super::fallback::FallbackLogger;
use crate::core::{ErrorCause, LogLevel, LogRecord, ModuleId, DEFAULT_QUALIFIER};
use parking_lot::RwLock;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Weak};

/// One log call on its way into a backend. The record is only built once
/// the backend accepts the call.
#[derive(Clone, Copy)]
pub struct LogCall<'a> {
    pub channel: &'a str,
    pub level: LogLevel,
    pub message: &'a str,
    pub cause: Option<&'a (dyn Error + 'static)>,
    pub module: Option<&'a ModuleId>,
    pub qualifier: &'a str,
    /// Description of the object the call was made on behalf of
    pub origin: Option<&'a str>,
}

impl<'a> LogCall<'a> {
    pub fn new(channel: &'a str, level: LogLevel, message: &'a str) -> Self {
        Self {
            channel,
            level,
            message,
            cause: None,
            module: None,
            qualifier: DEFAULT_QUALIFIER,
            origin: None,
        }
    }

    pub fn to_record(&self) -> LogRecord {
        LogRecord::new(self.channel, self.level, self.message)
            .with_cause(self.cause.map(ErrorCause::from_error))
            .with_module(self.module.cloned())
            .with_qualifier(self.qualifier)
    }
}

impl fmt::Debug for LogCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCall")
            .field("channel", &self.channel)
            .field("level", &self.level)
            .field("message", &self.message)
            .field("cause", &self.cause.map(|c| c.to_string()))
            .finish()
    }
}

/// Destination of handle log calls once configured
pub trait LogBackend: Send + Sync {
    fn is_enabled(&self, channel: &str, level: LogLevel) -> bool;

    /// Decide, build and deliver one call. Must not panic or block on
    /// reconfiguration.
    fn route(&self, call: LogCall<'_>);
}

/// Backend shared by every handle of one registry
pub(crate) struct BackendSlot {
    backend: RwLock<Option<Weak<dyn LogBackend>>>,
    fallback: Arc<FallbackLogger>,
}

impl BackendSlot {
    pub(crate) fn new(fallback: Arc<FallbackLogger>) -> Self {
        Self {
            backend: RwLock::new(None),
            fallback,
        }
    }

    /// Live backend, `None` when detached or already dropped
    #[inline]
    pub(crate) fn backend(&self) -> Option<Arc<dyn LogBackend>> {
        self.backend.read().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn attach(&self, backend: Weak<dyn LogBackend>) -> bool {
        self.backend.write().replace(backend).is_some()
    }

    pub(crate) fn detach(&self, backend: &Weak<dyn LogBackend>) -> bool {
        let mut slot = self.backend.write();
        if slot.as_ref().is_some_and(|current| Weak::ptr_eq(current, backend)) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn fallback(&self) -> &Arc<FallbackLogger> {
        &self.fallback
    }
}

/// Named logging channel.
///
/// Cheap to clone; clones share identity.
#[derive(Clone)]
pub struct LoggerHandle {
    channel: Arc<str>,
    qualifier: Arc<str>,
    module: Option<Arc<ModuleId>>,
    slot: Arc<BackendSlot>,
}

impl LoggerHandle {
    pub(crate) fn new(channel: Arc<str>, slot: Arc<BackendSlot>) -> Self {
        Self {
            channel,
            qualifier: Arc::from(DEFAULT_QUALIFIER),
            module: None,
            slot,
        }
    }

    /// Channel name, empty for the root channel
    pub fn name(&self) -> &str {
        &self.channel
    }

    pub fn is_root(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn module(&self) -> Option<&ModuleId> {
        self.module.as_deref()
    }

    /// Handle for the same channel reporting `qualifier` as its call site
    #[must_use]
    pub fn with_qualifier(&self, qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: Arc::from(qualifier.into()),
            ..self.clone()
        }
    }

    /// Handle for the same channel stamping `module` on its records
    #[must_use]
    pub fn with_module(&self, module: ModuleId) -> Self {
        Self {
            module: Some(Arc::new(module)),
            ..self.clone()
        }
    }

    /// Both handles came from the same registry entry
    pub fn same_channel(&self, other: &LoggerHandle) -> bool {
        Arc::ptr_eq(&self.channel, &other.channel)
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        match self.slot.backend() {
            Some(backend) => backend.is_enabled(&self.channel, level),
            None => self.slot.fallback().is_enabled(level),
        }
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Trace)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Debug)
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        self.emit(level, message.as_ref(), None);
    }

    pub fn log_with_cause(
        &self,
        level: LogLevel,
        message: impl AsRef<str>,
        cause: &(dyn Error + 'static),
    ) {
        self.emit(level, message.as_ref(), Some(cause));
    }

    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    pub fn fatal(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Fatal, message);
    }

    fn emit(&self, level: LogLevel, message: &str, cause: Option<&(dyn Error + 'static)>) {
        let call = LogCall {
            channel: &self.channel,
            level,
            message,
            cause,
            module: self.module.as_deref(),
            qualifier: &self.qualifier,
            origin: None,
        };

        match self.slot.backend() {
            Some(backend) => backend.route(call),
            None => self.slot.fallback().log(&call.to_record()),
        }
    }
}

impl fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHandle")
            .field("channel", &self.channel)
            .field("qualifier", &self.qualifier)
            .field("module", &self.module)
            .finish()
    }
}
