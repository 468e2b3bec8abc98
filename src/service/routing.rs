//! Routing service
//!
//! The object application code and facade adapters depend on. It resolves
//! logger handles through the category registry, decides each call once
//! against the active engine context and fans accepted records out to the
//! engine, the history buffer and the event poster.

use super::events::{AsyncEventPoster, DEFAULT_EVENT_QUEUE};
use super::handle::{LogBackend, LogCall, LoggerHandle};
use super::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use super::registry::CategoryRegistry;
use super::scoped::ModuleLogService;
use crate::appenders::{SinkDirectory, SinkRegistry};
use crate::config::{
    ConfigProperties, ConfigurationController, ConfigurationNotifier, ConfigurationSource,
    DocumentSource, NoopNotifier,
};
use crate::core::{
    DiagnosticContext, LogLevel, LogRecord, ModuleId, Result, RoutingMetrics, StatusLogger,
    StatusSink,
};
use crate::engine::{
    EngineContext, EngineEnvironment, EngineState, DEFAULT_ASYNC_BUFFER, DEFAULT_SHUTDOWN_TIMEOUT,
};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Qualifier stamped on records logged directly through the service
pub const SERVICE_QUALIFIER: &str = "rust_logging_service::RoutingService";

/// Builder for [`RoutingService`]
pub struct RoutingServiceBuilder {
    registry: Option<Arc<CategoryRegistry>>,
    sinks: Option<Arc<dyn SinkDirectory>>,
    status: Option<Arc<dyn StatusSink>>,
    source: Option<Arc<dyn ConfigurationSource>>,
    notifier: Arc<dyn ConfigurationNotifier>,
    default_level: LogLevel,
    history_capacity: usize,
    event_queue: Option<usize>,
    async_available: bool,
    async_buffer: usize,
}

impl RoutingServiceBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            sinks: None,
            status: None,
            source: None,
            notifier: Arc::new(NoopNotifier),
            default_level: LogLevel::Info,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_queue: Some(DEFAULT_EVENT_QUEUE),
            async_available: cfg!(feature = "async"),
            async_buffer: DEFAULT_ASYNC_BUFFER,
        }
    }

    /// Registry whose handles this service backs; a fresh one by default
    #[must_use]
    pub fn registry(mut self, registry: Arc<CategoryRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Directory `sink` appenders look their sinks up in
    #[must_use]
    pub fn sinks(mut self, sinks: Arc<dyn SinkDirectory>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    #[must_use]
    pub fn status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace the document based configuration source
    #[must_use]
    pub fn source(mut self, source: Arc<dyn ConfigurationSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn ConfigurationNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Root level of the default configuration
    #[must_use]
    pub fn default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Capacity of the event queue
    #[must_use]
    pub fn event_queue(mut self, capacity: usize) -> Self {
        self.event_queue = Some(capacity);
        self
    }

    /// Run without the event poster
    #[must_use]
    pub fn without_events(mut self) -> Self {
        self.event_queue = None;
        self
    }

    /// Whether the asynchronous engine may be selected
    #[must_use]
    pub fn async_available(mut self, available: bool) -> Self {
        self.async_available = available;
        self
    }

    /// Queue capacity of asynchronous engine contexts
    #[must_use]
    pub fn async_buffer(mut self, size: usize) -> Self {
        self.async_buffer = size;
        self
    }

    /// Configure the defaults, start the event poster and attach the
    /// service to its registry.
    pub fn build(self) -> Result<Arc<RoutingService>> {
        let status: Arc<dyn StatusSink> = self
            .status
            .unwrap_or_else(|| Arc::new(StatusLogger::new()));
        let sinks: Arc<dyn SinkDirectory> = self.sinks.unwrap_or_else(|| Arc::new(SinkRegistry::new()));
        let registry = self.registry.unwrap_or_else(|| Arc::new(CategoryRegistry::new()));
        let metrics = Arc::new(RoutingMetrics::new());
        let history = Arc::new(HistoryBuffer::with_capacity(self.history_capacity));

        let events = match self.event_queue {
            Some(capacity) => Some(AsyncEventPoster::new(
                capacity,
                Arc::clone(&status),
                Arc::clone(&metrics),
            )?),
            None => None,
        };

        let source = self.source.unwrap_or_else(|| {
            Arc::new(DocumentSource::new(
                EngineEnvironment::new(sinks, Arc::clone(&status)).with_async_buffer(self.async_buffer),
            ))
        });
        let controller = ConfigurationController::builder()
            .source(source)
            .notifier(self.notifier)
            .status(Arc::clone(&status))
            .metrics(Arc::clone(&metrics))
            .history(Arc::clone(&history))
            .default_level(self.default_level)
            .async_available(self.async_available)
            .build();

        let service = Arc::new_cyclic(|me| RoutingService {
            me: me.clone(),
            registry,
            controller,
            history,
            events,
            diagnostic: DiagnosticContext::new(),
            status,
            metrics,
            closed: AtomicBool::new(false),
        });

        let backend: Weak<dyn LogBackend> = service.me.clone();
        if service.registry.attach(backend) {
            service
                .status
                .warn("Category registry was attached to another routing service; replaced.");
        }
        Ok(service)
    }
}

impl Default for RoutingServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Central logging service.
///
/// # Example
///
/// ```
/// use rust_logging_service::core::{LogLevel, StatusLogger};
/// use rust_logging_service::service::RoutingService;
/// use std::sync::Arc;
///
/// let service = RoutingService::builder()
///     .status(Arc::new(StatusLogger::quiet()))
///     .build()
///     .unwrap();
///
/// let logger = service.get_logger("com.acme.orders");
/// logger.info("order accepted");
/// logger.debug("filtered by the default INFO threshold");
///
/// assert_eq!(service.history().len(), 1);
/// service.shutdown();
/// ```
pub struct RoutingService {
    me: Weak<RoutingService>,
    registry: Arc<CategoryRegistry>,
    controller: ConfigurationController,
    history: Arc<HistoryBuffer>,
    events: Option<AsyncEventPoster>,
    diagnostic: DiagnosticContext,
    status: Arc<dyn StatusSink>,
    metrics: Arc<RoutingMetrics>,
    closed: AtomicBool,
}

impl RoutingService {
    pub fn builder() -> RoutingServiceBuilder {
        RoutingServiceBuilder::new()
    }

    /// Handle for `channel`; `""` is the root channel
    pub fn get_logger(&self, channel: &str) -> LoggerHandle {
        self.registry.get_or_create(channel)
    }

    pub fn root_logger(&self) -> LoggerHandle {
        self.registry.root()
    }

    /// Log on `channel`. Never fails; before a configuration is active the
    /// call goes to the fallback logger.
    pub fn log(
        &self,
        channel: &str,
        level: LogLevel,
        message: &str,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        self.route_call(LogCall {
            cause,
            qualifier: SERVICE_QUALIFIER,
            ..LogCall::new(channel, level, message)
        });
    }

    /// Log with a legacy numeric level on the channel named after `module`
    /// (the root channel when absent)
    pub fn log_legacy(
        &self,
        module: Option<&ModuleId>,
        code: i32,
        message: &str,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        let channel = module.map_or("", |m| m.symbolic_name.as_str());
        self.route_call(LogCall {
            cause,
            module,
            qualifier: SERVICE_QUALIFIER,
            ..LogCall::new(channel, LogLevel::from_legacy_code(code), message)
        });
    }

    /// Module-scoped view that stamps `module` on every record
    pub fn scoped(self: &Arc<Self>, module: ModuleId) -> ModuleLogService {
        ModuleLogService::new(Arc::clone(self), module)
    }

    /// Legacy code of the default threshold
    pub fn legacy_log_level(&self) -> i32 {
        self.controller.default_level().legacy_code()
    }

    pub fn is_enabled(&self, channel: &str, level: LogLevel) -> bool {
        self.enabled(channel, level)
    }

    /// Apply a configuration snapshot; `None` restores the defaults
    pub fn updated(&self, configuration: Option<&ConfigProperties>) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.controller.updated(configuration);
    }

    pub fn history(&self) -> &Arc<HistoryBuffer> {
        &self.history
    }

    pub fn events(&self) -> Option<&AsyncEventPoster> {
        self.events.as_ref()
    }

    pub fn diagnostic_context(&self) -> &DiagnosticContext {
        &self.diagnostic
    }

    pub fn controller(&self) -> &ConfigurationController {
        &self.controller
    }

    pub fn registry(&self) -> &Arc<CategoryRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &RoutingMetrics {
        &self.metrics
    }

    pub fn status(&self) -> &Arc<dyn StatusSink> {
        &self.status
    }

    /// Flush the appenders of the active context
    pub fn flush(&self) {
        if let Some(ctx) = self.controller.current() {
            ctx.flush();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Detach from the registry, stop the engine and drain pending events.
    /// Handles keep working through the fallback logger. Idempotent.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let backend: Weak<dyn LogBackend> = self.me.clone();
        self.registry.detach(&backend);
        self.controller.shutdown();
        if let Some(events) = &self.events {
            events.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }
        self.status.info("Logging service stopped.");
    }

    /// The published context, re-read once if it was retired between the
    /// read and its use
    fn active_context(&self) -> Option<Arc<EngineContext>> {
        let ctx = self.controller.current()?;
        if ctx.state() == EngineState::Started {
            return Some(ctx);
        }
        self.controller.current()
    }

    fn enabled(&self, channel: &str, level: LogLevel) -> bool {
        match self.active_context() {
            Some(ctx) => ctx.is_enabled(channel, level),
            None => self.registry.fallback().is_enabled(level),
        }
    }

    pub(crate) fn route_call(&self, call: LogCall<'_>) {
        let Some(ctx) = self.active_context() else {
            let fallback = self.registry.fallback();
            if fallback.is_enabled(call.level) {
                fallback.log(&call.to_record());
                self.metrics.record_fallback();
            }
            return;
        };

        if !ctx.accepts(call.channel, call.level) {
            self.metrics.record_filtered();
            return;
        }
        self.metrics.record_accepted();

        let context = self.diagnostic.snapshot();
        let mut record = call.to_record();
        if !context.is_empty() {
            record = record.with_context(context.clone());
        }

        self.deliver(ctx, &record);
        self.history.push(record.clone());
        if let Some(events) = &self.events {
            events.post(record, call.origin, context);
        }
    }

    /// Hand `record` to `ctx`, following the published context if `ctx` was
    /// retired after the enablement decision
    fn deliver(&self, mut ctx: Arc<EngineContext>, record: &LogRecord) {
        while !ctx.dispatch(record.clone()) {
            match self.controller.current() {
                Some(next) if !Arc::ptr_eq(&next, &ctx) => ctx = next,
                _ => {
                    self.registry.fallback().log(record);
                    return;
                }
            }
        }
    }
}

impl LogBackend for RoutingService {
    fn is_enabled(&self, channel: &str, level: LogLevel) -> bool {
        self.enabled(channel, level)
    }

    fn route(&self, call: LogCall<'_>) {
        self.route_call(call);
    }
}

impl fmt::Debug for RoutingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingService")
            .field("controller", &self.controller)
            .field("registry", &self.registry)
            .field("history", &self.history.len())
            .field("closed", &self.is_shut_down())
            .finish()
    }
}

impl Drop for RoutingService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
