//! Configuration controller
//!
//! Owns the current engine context and replaces it when a new
//! configuration snapshot arrives. A new context is built and started off
//! to the side, published with a single reference swap, and only then is
//! the previous context stopped, so readers always see a started context.
//! A reader still holding the previous context when it stops finds its
//! successor through [`ConfigurationController::current`].
//!
//! Reconfigurations are serialized by one lock around the whole
//! build, swap and notify sequence. Log calls never take that lock.

use super::notifier::{ConfigurationNotifier, NoopNotifier};
use super::properties::{
    ConfigProperties, ASYNC_KEY, CONFIG_FILE_KEY, ENGINE_PREFIX, HISTORY_SIZE_KEY,
    HISTORY_SIZE_LEGACY_KEY,
};
use super::source::{ConfigurationSource, DocumentSource};
use crate::core::{LogLevel, LoggerError, RoutingMetrics, StatusLogger, StatusSink};
use crate::engine::{EngineContext, EngineEnvironment, EngineMode};
use crate::service::HistoryBuffer;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unconfigured,
    Configuring,
    Active,
    Stopped,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Unconfigured => write!(f, "unconfigured"),
            ControllerState::Configuring => write!(f, "configuring"),
            ControllerState::Active => write!(f, "active"),
            ControllerState::Stopped => write!(f, "stopped"),
        }
    }
}

enum Request {
    Defaults,
    File(PathBuf),
    Inline(ConfigProperties),
}

impl Request {
    fn describe(&self) -> String {
        match self {
            Request::Defaults => "default configuration".to_string(),
            Request::File(path) => format!("file '{}'", path.display()),
            Request::Inline(_) => "inline properties".to_string(),
        }
    }
}

struct Control {
    state: ControllerState,
    /// The published context was built from the defaults
    defaults_active: bool,
}

/// Builder for [`ConfigurationController`]
pub struct ControllerBuilder {
    source: Option<Arc<dyn ConfigurationSource>>,
    notifier: Arc<dyn ConfigurationNotifier>,
    status: Arc<dyn StatusSink>,
    metrics: Arc<RoutingMetrics>,
    history: Option<Arc<HistoryBuffer>>,
    default_level: LogLevel,
    async_available: bool,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            notifier: Arc::new(NoopNotifier),
            status: Arc::new(StatusLogger::new()),
            metrics: Arc::new(RoutingMetrics::new()),
            history: None,
            default_level: LogLevel::Info,
            async_available: cfg!(feature = "async"),
        }
    }

    /// Source used to build contexts; a [`DocumentSource`] over the
    /// controller's status sink by default
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

    #[must_use]
    pub fn status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: Arc<RoutingMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// History buffer whose capacity follows the history size keys
    #[must_use]
    pub fn history(mut self, history: Arc<HistoryBuffer>) -> Self {
        self.history = Some(history);
        self
    }

    /// Root level of the default configuration
    #[must_use]
    pub fn default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    /// Whether the asynchronous engine may be selected
    #[must_use]
    pub fn async_available(mut self, available: bool) -> Self {
        self.async_available = available;
        self
    }

    /// Create the controller and configure the defaults
    pub fn build(self) -> ConfigurationController {
        let source = self.source.unwrap_or_else(|| {
            Arc::new(DocumentSource::new(EngineEnvironment::new(
                Arc::new(crate::appenders::SinkRegistry::new()),
                Arc::clone(&self.status),
            )))
        });

        let controller = ConfigurationController {
            source,
            notifier: self.notifier,
            status: self.status,
            metrics: self.metrics,
            history: self.history,
            default_level: self.default_level,
            async_available: self.async_available,
            current: RwLock::new(None),
            control: Mutex::new(Control {
                state: ControllerState::Unconfigured,
                defaults_active: false,
            }),
        };
        controller.updated(None);
        controller
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the active engine context.
///
/// # Example
///
/// ```
/// use rust_logging_service::config::{ConfigProperties, ConfigurationController, ControllerState};
/// use rust_logging_service::core::{LogLevel, StatusLogger};
/// use std::sync::Arc;
///
/// let controller = ConfigurationController::builder()
///     .status(Arc::new(StatusLogger::quiet()))
///     .build();
/// assert_eq!(controller.state(), ControllerState::Active);
///
/// controller.updated(Some(&ConfigProperties::new().with("engine.rootLogger.level", "debug")));
/// let ctx = controller.current().unwrap();
/// assert_eq!(ctx.effective_level("app"), LogLevel::Debug);
///
/// controller.shutdown();
/// assert!(controller.current().is_none());
/// ```
pub struct ConfigurationController {
    source: Arc<dyn ConfigurationSource>,
    notifier: Arc<dyn ConfigurationNotifier>,
    status: Arc<dyn StatusSink>,
    metrics: Arc<RoutingMetrics>,
    history: Option<Arc<HistoryBuffer>>,
    default_level: LogLevel,
    async_available: bool,
    current: RwLock<Option<Arc<EngineContext>>>,
    control: Mutex<Control>,
}

impl ConfigurationController {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// The published engine context; `None` before the first successful
    /// configuration and after shutdown
    #[inline]
    pub fn current(&self) -> Option<Arc<EngineContext>> {
        self.current.read().clone()
    }

    pub fn state(&self) -> ControllerState {
        self.control.lock().state
    }

    pub fn default_level(&self) -> LogLevel {
        self.default_level
    }

    /// Apply a configuration snapshot; `None` requests the defaults.
    ///
    /// Never fails: problems are reported to the status sink and the
    /// notifier, and a failed build leaves the current context in place.
    /// Ignored once the controller is stopped.
    pub fn updated(&self, configuration: Option<&ConfigProperties>) {
        let mut control = self.control.lock();
        if control.state == ControllerState::Stopped {
            return;
        }

        let Some(props) = configuration else {
            self.configure(&mut control, EngineMode::Sync, Request::Defaults);
            return;
        };

        let mut mode = if props.get_bool(ASYNC_KEY) {
            EngineMode::Async
        } else {
            EngineMode::Sync
        };
        if mode == EngineMode::Async && !self.async_available {
            self.status.warn(
                "Asynchronous engine requested, but it is not available. \
                 Reverting to the synchronous engine.",
            );
            mode = EngineMode::Sync;
        }

        let request = match props.get(CONFIG_FILE_KEY) {
            Some(file) => Request::File(PathBuf::from(file)),
            None => Request::Inline(props.subset(ENGINE_PREFIX)),
        };
        self.configure(&mut control, mode, request);
        self.apply_history_size(props);
    }

    fn configure(&self, control: &mut Control, mode: EngineMode, request: Request) {
        let request = match request {
            Request::File(path) if !path.is_file() => {
                self.status.warn(&format!(
                    "Configuration file '{}' is not available. Default configuration will be used.",
                    path.display()
                ));
                Request::Defaults
            }
            Request::Inline(props) if props.is_empty() => Request::Defaults,
            other => other,
        };

        let is_defaults = matches!(request, Request::Defaults);
        if is_defaults && control.defaults_active {
            return;
        }

        let previous_state = control.state;
        control.state = ControllerState::Configuring;

        let built = match &request {
            Request::Defaults => self.source.defaults(self.default_level, mode),
            Request::File(path) => self.source.from_file(path, mode),
            Request::Inline(props) => self.source.from_properties(props, mode),
        }
        .and_then(|ctx| {
            ctx.start()?;
            Ok(ctx)
        });

        match built {
            Ok(ctx) => {
                let ctx = Arc::new(ctx);
                let previous = self.current.write().replace(Arc::clone(&ctx));
                if let Some(previous) = previous {
                    previous.stop();
                }

                control.defaults_active = is_defaults;
                control.state = ControllerState::Active;
                self.metrics.record_reconfiguration();
                self.status.info(&format!(
                    "Engine '{}' ({}) configured using {}.",
                    ctx.name(),
                    ctx.mode(),
                    request.describe()
                ));
                self.notifier.configuration_done();
            }
            Err(e) => {
                control.state = if previous_state == ControllerState::Unconfigured {
                    ControllerState::Unconfigured
                } else {
                    ControllerState::Active
                };
                self.metrics.record_configuration_failure();
                self.status.error(&format!(
                    "Engine configuration problem with {}: {}",
                    request.describe(),
                    e
                ));
                self.notifier.configuration_error(&e);
            }
        }
    }

    fn apply_history_size(&self, props: &ConfigProperties) {
        let Some(history) = &self.history else {
            return;
        };
        let Some((key, value)) = [HISTORY_SIZE_KEY, HISTORY_SIZE_LEGACY_KEY]
            .into_iter()
            .find_map(|key| props.get(key).map(|value| (key, value)))
        else {
            return;
        };

        match value.trim().parse::<usize>() {
            Ok(size) => history.set_capacity(size),
            Err(e) => {
                let err = LoggerError::config(key, format!("invalid size '{}': {}", value, e));
                self.status.error(&err.to_string());
            }
        }
    }

    /// Stop the current context; later updates are ignored. Idempotent.
    pub fn shutdown(&self) {
        let mut control = self.control.lock();
        if control.state == ControllerState::Stopped {
            return;
        }
        control.state = ControllerState::Stopped;
        control.defaults_active = false;

        let current = self.current.write().take();
        if let Some(ctx) = current {
            ctx.stop();
        }
    }
}

impl fmt::Debug for ConfigurationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationController")
            .field("state", &self.state())
            .field("current", &self.current())
            .finish()
    }
}

impl Drop for ConfigurationController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordingNotifier;
    use crate::core::Result;
    use crate::engine::EngineState;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counts builds and can be switched to fail
    struct CountingSource {
        inner: DocumentSource,
        builds: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                inner: DocumentSource::new(EngineEnvironment::new(
                    Arc::new(crate::appenders::SinkRegistry::new()),
                    Arc::new(StatusLogger::quiet()),
                )),
                builds: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }

        fn count(&self) -> Result<()> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(LoggerError::other("build refused"));
            }
            Ok(())
        }
    }

    impl ConfigurationSource for CountingSource {
        fn from_file(&self, path: &Path, mode: EngineMode) -> Result<EngineContext> {
            self.count()?;
            self.inner.from_file(path, mode)
        }

        fn from_properties(&self, props: &ConfigProperties, mode: EngineMode) -> Result<EngineContext> {
            self.count()?;
            self.inner.from_properties(props, mode)
        }

        fn defaults(&self, level: LogLevel, mode: EngineMode) -> Result<EngineContext> {
            self.count()?;
            self.inner.defaults(level, mode)
        }
    }

    struct Fixture {
        controller: ConfigurationController,
        source: Arc<CountingSource>,
        notifier: Arc<RecordingNotifier>,
        status: Arc<StatusLogger>,
        history: Arc<HistoryBuffer>,
    }

    fn fixture(async_available: bool) -> Fixture {
        let source = Arc::new(CountingSource::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let status = Arc::new(StatusLogger::quiet());
        let history = Arc::new(HistoryBuffer::new());
        let controller = ConfigurationController::builder()
            .source(source.clone())
            .notifier(notifier.clone())
            .status(status.clone())
            .history(history.clone())
            .async_available(async_available)
            .build();
        Fixture {
            controller,
            source,
            notifier,
            status,
            history,
        }
    }

    fn inline(level: &str) -> ConfigProperties {
        ConfigProperties::new().with("engine.rootLogger.level", level)
    }

    #[test]
    fn test_construction_configures_defaults() {
        let f = fixture(true);
        assert_eq!(f.controller.state(), ControllerState::Active);
        assert_eq!(f.source.builds.load(Ordering::SeqCst), 1);
        assert_eq!(f.notifier.done_count(), 1);

        let ctx = f.controller.current().unwrap();
        assert_eq!(ctx.state(), EngineState::Started);
        assert_eq!(ctx.effective_level("x"), LogLevel::Info);
    }

    #[test]
    fn test_redundant_defaults_do_not_rebuild() {
        let f = fixture(true);
        let before = f.controller.current().unwrap().id();

        f.controller.updated(None);
        f.controller.updated(Some(&ConfigProperties::new()));
        f.controller.updated(Some(&ConfigProperties::new().with("unrelated", "x")));

        assert_eq!(f.source.builds.load(Ordering::SeqCst), 1);
        assert_eq!(f.controller.current().unwrap().id(), before);
        assert_eq!(f.notifier.done_count(), 1);
    }

    #[test]
    fn test_swap_stops_previous_context() {
        let f = fixture(true);
        let old = f.controller.current().unwrap();

        f.controller.updated(Some(&inline("debug")));

        let new = f.controller.current().unwrap();
        assert_ne!(old.id(), new.id());
        assert_eq!(old.state(), EngineState::Stopped);
        assert_eq!(new.state(), EngineState::Started);
        assert_eq!(new.effective_level("x"), LogLevel::Debug);
        assert_eq!(f.notifier.done_count(), 2);
    }

    #[test]
    fn test_failed_build_keeps_current_context() {
        let f = fixture(true);
        f.controller.updated(Some(&inline("debug")));
        let before = f.controller.current().unwrap();

        f.controller.updated(Some(&inline("loud")));

        let after = f.controller.current().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.state(), EngineState::Started);
        assert_eq!(f.controller.state(), ControllerState::Active);
        assert_eq!(f.notifier.error_count(), 1);
        assert!(f.notifier.last_error().unwrap().contains("loud"));
        assert!(f.status.contains(LogLevel::Error, "Engine configuration problem"));
    }

    #[test]
    fn test_failed_initial_build_stays_unconfigured() {
        let source = Arc::new(CountingSource::new());
        source.fail.store(true, Ordering::SeqCst);
        let notifier = Arc::new(RecordingNotifier::new());
        let controller = ConfigurationController::builder()
            .source(source.clone())
            .notifier(notifier.clone())
            .status(Arc::new(StatusLogger::quiet()))
            .build();

        assert_eq!(controller.state(), ControllerState::Unconfigured);
        assert!(controller.current().is_none());
        assert_eq!(notifier.error_count(), 1);

        source.fail.store(false, Ordering::SeqCst);
        controller.updated(None);
        assert_eq!(controller.state(), ControllerState::Active);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let f = fixture(true);
        f.controller.updated(Some(&inline("error")));
        assert_eq!(f.controller.current().unwrap().effective_level("x"), LogLevel::Error);

        let missing = ConfigProperties::new().with(CONFIG_FILE_KEY, "/definitely/not/here.xml");
        f.controller.updated(Some(&missing));

        let ctx = f.controller.current().unwrap();
        assert_eq!(ctx.name(), "default");
        assert_eq!(ctx.effective_level("x"), LogLevel::Info);
        assert_eq!(f.status.count(LogLevel::Warn), 1);
        assert!(f.status.contains(LogLevel::Warn, "is not available"));
    }

    #[test]
    fn test_file_takes_priority_over_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.properties");
        std::fs::write(&path, "rootLogger.level = warn\n").unwrap();

        let f = fixture(true);
        let props = inline("trace").with(CONFIG_FILE_KEY, path.display().to_string());
        f.controller.updated(Some(&props));

        assert_eq!(f.controller.current().unwrap().effective_level("x"), LogLevel::Warn);
    }

    #[test]
    fn test_async_requested_but_unavailable() {
        let f = fixture(false);
        f.controller.updated(Some(&inline("info").with(ASYNC_KEY, "true")));

        assert_eq!(f.controller.current().unwrap().mode(), EngineMode::Sync);
        assert_eq!(f.status.count(LogLevel::Warn), 1);
        assert_eq!(f.notifier.error_count(), 0);
    }

    #[test]
    fn test_async_engine_selected() {
        let f = fixture(true);
        f.controller.updated(Some(&inline("info").with(ASYNC_KEY, "TRUE")));
        assert_eq!(f.controller.current().unwrap().mode(), EngineMode::Async);
    }

    #[test]
    fn test_history_size_keys() {
        let f = fixture(true);

        f.controller.updated(Some(&ConfigProperties::new().with(HISTORY_SIZE_LEGACY_KEY, "7")));
        assert_eq!(f.history.capacity(), 7);

        let both = ConfigProperties::new()
            .with(HISTORY_SIZE_KEY, "5")
            .with(HISTORY_SIZE_LEGACY_KEY, "9");
        f.controller.updated(Some(&both));
        assert_eq!(f.history.capacity(), 5);

        f.controller.updated(Some(&ConfigProperties::new().with(HISTORY_SIZE_KEY, "lots")));
        assert_eq!(f.history.capacity(), 5);
        assert!(f.status.contains(LogLevel::Error, "invalid size 'lots'"));
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let f = fixture(true);
        let ctx = f.controller.current().unwrap();

        f.controller.shutdown();
        f.controller.shutdown();
        assert_eq!(f.controller.state(), ControllerState::Stopped);
        assert_eq!(ctx.state(), EngineState::Stopped);
        assert!(f.controller.current().is_none());

        f.controller.updated(Some(&inline("debug")));
        assert!(f.controller.current().is_none());
        assert_eq!(f.source.builds.load(Ordering::SeqCst), 1);
    }
}
