//! Category registry: channel name to logger handle
//!
//! Handles are created lazily and cached for the life of the registry.
//! The root channel is only reachable through the empty name (or
//! [`CategoryRegistry::root`]); a literal `"root"` is an ordinary channel.

use super::fallback::FallbackLogger;
use super::handle::{BackendSlot, LogBackend, LoggerHandle};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Process-wide table of logger handles sharing one backend slot.
///
/// # Example
///
/// ```
/// use rust_logging_service::service::CategoryRegistry;
///
/// let registry = CategoryRegistry::new();
/// let a = registry.get_or_create("com.acme.db");
/// let b = registry.get_or_create("com.acme.db");
/// assert!(a.same_channel(&b));
///
/// assert!(registry.get_or_create("").is_root());
/// assert!(!registry.get_or_create("root").is_root());
/// ```
pub struct CategoryRegistry {
    slot: Arc<BackendSlot>,
    root: LoggerHandle,
    handles: RwLock<HashMap<String, LoggerHandle>>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(FallbackLogger::new()))
    }

    pub fn with_fallback(fallback: Arc<FallbackLogger>) -> Self {
        let slot = Arc::new(BackendSlot::new(fallback));
        Self {
            root: LoggerHandle::new(Arc::from(""), Arc::clone(&slot)),
            slot,
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> LoggerHandle {
        self.root.clone()
    }

    /// Handle for `name`, created on first request. `""` is the root.
    pub fn get_or_create(&self, name: &str) -> LoggerHandle {
        if name.is_empty() {
            return self.root();
        }
        if let Some(handle) = self.handles.read().get(name) {
            return handle.clone();
        }

        self.handles
            .write()
            .entry(name.to_string())
            .or_insert_with(|| LoggerHandle::new(Arc::from(name), Arc::clone(&self.slot)))
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        name.is_empty() || self.handles.read().contains_key(name)
    }

    /// Number of cached non-root handles
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Route every handle through `backend`. Returns `true` when another
    /// backend was replaced.
    pub fn attach(&self, backend: Weak<dyn LogBackend>) -> bool {
        self.slot.attach(backend)
    }

    /// Revert to the fallback logger if `backend` is the attached one
    pub fn detach(&self, backend: &Weak<dyn LogBackend>) -> bool {
        self.slot.detach(backend)
    }

    pub fn is_attached(&self) -> bool {
        self.slot.backend().is_some()
    }

    pub fn fallback(&self) -> &Arc<FallbackLogger> {
        self.slot.fallback()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CategoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryRegistry")
            .field("channels", &self.len())
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Appender, LogLevel, LogRecord, Result};
    use crate::service::LogCall;
    use parking_lot::Mutex;
    use std::thread;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Appender for Capture {
        fn append(&mut self, record: &LogRecord) -> Result<()> {
            self.0
                .lock()
                .push(format!("{}|{}", record.display_channel(), record.message));
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    /// Accepts Warn and above, remembers what it routed
    #[derive(Default)]
    struct WarnBackend {
        routed: Mutex<Vec<String>>,
    }

    impl LogBackend for WarnBackend {
        fn is_enabled(&self, _channel: &str, level: LogLevel) -> bool {
            level >= LogLevel::Warn
        }

        fn route(&self, call: LogCall<'_>) {
            if self.is_enabled(call.channel, call.level) {
                self.routed.lock().push(call.message.to_string());
            }
        }
    }

    fn registry_with_capture() -> (CategoryRegistry, Capture) {
        let capture = Capture::default();
        let fallback = Arc::new(FallbackLogger::with_appender(Box::new(capture.clone())));
        (CategoryRegistry::with_fallback(fallback), capture)
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let registry = CategoryRegistry::new();
        let a = registry.get_or_create("com.acme");
        let b = registry.get_or_create("com.acme");

        assert!(a.same_channel(&b));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("com.acme"));
        assert!(!registry.contains("com"));
    }

    #[test]
    fn test_root_is_not_aliased() {
        let registry = CategoryRegistry::new();
        let root = registry.get_or_create("");
        let literal = registry.get_or_create("root");

        assert!(root.is_root());
        assert!(root.same_channel(&registry.root()));
        assert!(!literal.is_root());
        assert!(!root.same_channel(&literal));
        assert_eq!(registry.channel_names(), vec!["root".to_string()]);
    }

    #[test]
    fn test_concurrent_first_lookup() {
        let registry = Arc::new(CategoryRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.get_or_create("shared.channel"))
            })
            .collect();

        let loggers: Vec<LoggerHandle> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(loggers.windows(2).all(|w| w[0].same_channel(&w[1])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_handles_follow_attach_and_detach() {
        let (registry, capture) = registry_with_capture();
        let early = registry.get_or_create("boot");
        early.info("before backend");
        assert_eq!(*capture.0.lock(), vec!["boot|before backend".to_string()]);

        let backend: Arc<dyn LogBackend> = Arc::new(WarnBackend::default());
        let weak = Arc::downgrade(&backend);
        assert!(!registry.attach(weak.clone()));
        assert!(registry.is_attached());

        early.info("filtered by backend");
        early.warn("routed to backend");
        assert!(!early.is_enabled(LogLevel::Info));
        assert_eq!(capture.0.lock().len(), 1);

        assert!(registry.detach(&weak));
        assert!(!registry.detach(&weak));
        early.info("after detach");
        assert_eq!(capture.0.lock().len(), 2);
    }

    #[test]
    fn test_dropped_backend_reverts_to_fallback() {
        let (registry, capture) = registry_with_capture();
        let handle = registry.get_or_create("svc");
        {
            let backend: Arc<dyn LogBackend> = Arc::new(WarnBackend::default());
            registry.attach(Arc::downgrade(&backend));
            handle.warn("to backend");
        }

        assert!(!registry.is_attached());
        handle.warn("to fallback");
        assert_eq!(*capture.0.lock(), vec!["svc|to fallback".to_string()]);
    }

    #[test]
    fn test_qualified_and_module_handles_share_channel() {
        let registry = CategoryRegistry::new();
        let base = registry.get_or_create("billing");
        let qualified = base
            .with_qualifier("com.acme.BillingFacade")
            .with_module(crate::core::ModuleId::new(3, "com.acme.billing"));

        assert!(base.same_channel(&qualified));
        assert_eq!(qualified.qualifier(), "com.acme.BillingFacade");
        assert_eq!(qualified.module().unwrap().id, 3);
        assert!(base.module().is_none());
    }
}
