//! Engine context: the started realization of one configuration
//!
//! An engine context owns the threshold tree and the appenders built from a
//! configuration. It is created `Initialized`, accepts records only while
//! `Started`, and is retired with [`EngineContext::stop`], after which it
//! silently drops anything still handed to it.
//!
//! Two dispatch modes exist. `Sync` writes on the caller's thread. `Async`
//! queues records on a bounded channel drained in batches by a worker
//! thread; when the queue is full, Error and Fatal records are written on
//! the caller's thread instead of being dropped.

use super::threshold::ThresholdTree;
use crate::core::{Appender, LogLevel, LogRecord, LoggerError, Result, StatusSink};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Maximum time spent draining an async worker when a context stops
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Queue capacity of the async engine
pub const DEFAULT_ASYNC_BUFFER: usize = 4096;

const BATCH_SIZE: usize = 50;
const BATCH_TIMEOUT_MS: u64 = 10;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineMode {
    #[default]
    Sync,
    Async,
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMode::Sync => write!(f, "synchronous"),
            EngineMode::Async => write!(f, "asynchronous"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initialized,
    Started,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Initialized => write!(f, "initialized"),
            EngineState::Started => write!(f, "started"),
            EngineState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Per-context counters
#[derive(Debug, Default)]
pub struct EngineStats {
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl EngineStats {
    /// Records delivered to every routed appender
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Records at least one appender failed on
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Records refused because the queue was full or the context not started
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub(crate) struct NamedAppender {
    name: String,
    inner: Mutex<Box<dyn Appender>>,
}

impl NamedAppender {
    pub(crate) fn new(appender: Box<dyn Appender>) -> Self {
        Self {
            name: appender.name().to_string(),
            inner: Mutex::new(appender),
        }
    }
}

struct EngineCore {
    name: String,
    tree: ThresholdTree,
    appenders: Vec<NamedAppender>,
    status: Arc<dyn StatusSink>,
    stats: EngineStats,
}

impl EngineCore {
    /// Write one record to its routed appenders, isolating each appender's
    /// errors and panics from the others.
    fn write(&self, record: &LogRecord, flush: bool) {
        let route = self.tree.route(&record.channel);
        let mut has_error = false;

        for &idx in &route.appenders {
            let Some(appender) = self.appenders.get(idx) else {
                continue;
            };
            let mut guard = appender.inner.lock();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                guard.append(record)?;
                if flush {
                    guard.flush()?;
                }
                Ok::<(), LoggerError>(())
            }));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.status
                        .error(&format!("Appender '{}' failed: {}", appender.name, e));
                    has_error = true;
                }
                Err(panic_info) => {
                    self.status.error(&format!(
                        "Appender '{}' panicked: {}. Other appenders continue to function.",
                        appender.name,
                        panic_message(panic_info.as_ref())
                    ));
                    has_error = true;
                }
            }
        }

        if has_error {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.written.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn write_batch(&self, batch: &[LogRecord]) {
        for record in batch {
            self.write(record, false);
        }
        self.flush_all();
    }

    fn flush_all(&self) {
        for appender in &self.appenders {
            let mut guard = appender.inner.lock();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| guard.flush()));
            if let Ok(Err(e)) = result {
                self.status
                    .error(&format!("Appender '{}' flush failed: {}", appender.name, e));
            }
        }
    }

    fn close_all(&self) {
        for appender in &self.appenders {
            if let Err(e) = appender.inner.lock().close() {
                self.status
                    .error(&format!("Appender '{}' close failed: {}", appender.name, e));
            }
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

struct Lifecycle {
    state: EngineState,
    sender: Option<Sender<LogRecord>>,
}

pub struct EngineContext {
    id: u64,
    mode: EngineMode,
    buffer_size: usize,
    core: Arc<EngineCore>,
    lifecycle: RwLock<Lifecycle>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl EngineContext {
    pub(crate) fn new(
        name: impl Into<String>,
        mode: EngineMode,
        buffer_size: usize,
        tree: ThresholdTree,
        appenders: Vec<NamedAppender>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            mode,
            buffer_size: buffer_size.max(1),
            core: Arc::new(EngineCore {
                name: name.into(),
                tree,
                appenders,
                status,
                stats: EngineStats::default(),
            }),
            lifecycle: RwLock::new(Lifecycle {
                state: EngineState::Initialized,
                sender: None,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Process-unique id; a new id means a new context was built
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn state(&self) -> EngineState {
        self.lifecycle.read_recursive().state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.core.stats
    }

    pub fn appender_names(&self) -> Vec<&str> {
        self.core.appenders.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn effective_level(&self, channel: &str) -> LogLevel {
        self.core.tree.effective_level(channel)
    }

    /// Whether a record at `level` on `channel` would be accepted now
    pub fn is_enabled(&self, channel: &str, level: LogLevel) -> bool {
        let lifecycle = self.lifecycle.read_recursive();
        lifecycle.state == EngineState::Started && self.accepts(channel, level)
    }

    /// Threshold decision alone, whatever the lifecycle state
    #[inline]
    pub fn accepts(&self, channel: &str, level: LogLevel) -> bool {
        self.core.tree.route(channel).accepts(level)
    }

    /// Begin accepting records, spawning the worker in async mode
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.write();
        if lifecycle.state != EngineState::Initialized {
            return Err(LoggerError::engine_state(self.name(), lifecycle.state.to_string()));
        }

        if self.mode == EngineMode::Async {
            let (sender, receiver) = bounded(self.buffer_size);
            let core = Arc::clone(&self.core);
            let handle = thread::Builder::new()
                .name(format!("engine-{}-{}", self.core.name, self.id))
                .spawn(move || Self::run_worker(core, receiver))
                .map_err(|e| LoggerError::worker_spawn("engine", e))?;
            lifecycle.sender = Some(sender);
            *self.worker.lock() = Some(handle);
        }

        lifecycle.state = EngineState::Started;
        Ok(())
    }

    /// Batch loop of the async worker: block for one record, gather whatever
    /// else is queued, write, flush. Exits once the channel is closed and
    /// drained.
    fn run_worker(core: Arc<EngineCore>, receiver: Receiver<LogRecord>) {
        let mut batch = Vec::with_capacity(BATCH_SIZE);

        loop {
            match receiver.recv() {
                Ok(record) => batch.push(record),
                Err(_) => break,
            }

            while batch.len() < BATCH_SIZE {
                match receiver.try_recv() {
                    Ok(record) => batch.push(record),
                    Err(_) => break,
                }
            }

            if batch.len() < BATCH_SIZE {
                thread::sleep(Duration::from_millis(BATCH_TIMEOUT_MS));
                while batch.len() < BATCH_SIZE {
                    match receiver.try_recv() {
                        Ok(record) => batch.push(record),
                        Err(_) => break,
                    }
                }
            }

            core.write_batch(&batch);
            batch.clear();
        }
    }

    /// Hand a record to the appenders routed for its channel.
    ///
    /// Returns `false` when the context is not started and the record was
    /// dropped. The threshold is not re-checked here; callers decide
    /// enablement once with [`EngineContext::is_enabled`].
    pub fn dispatch(&self, record: LogRecord) -> bool {
        // Recursive read: an appender may log through the same context
        let lifecycle = self.lifecycle.read_recursive();
        if lifecycle.state != EngineState::Started {
            self.core.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match lifecycle.sender {
            None => self.core.write(&record, true),
            Some(ref sender) => match sender.try_send(record) {
                Ok(()) => {}
                Err(TrySendError::Full(record)) => self.handle_overflow(record),
                Err(TrySendError::Disconnected(_)) => {
                    self.core.stats.dropped.fetch_add(1, Ordering::Relaxed);
                }
            },
        }
        true
    }

    fn handle_overflow(&self, record: LogRecord) {
        if record.level.is_critical() {
            self.core.write(&record, true);
            return;
        }

        let dropped = self.core.stats.dropped.fetch_add(1, Ordering::Relaxed);
        if dropped == 0 || (dropped + 1) % 1000 == 0 {
            self.core.status.warn(&format!(
                "Engine '{}' queue full, {} records dropped. \
                 Consider a larger buffer or the synchronous engine.",
                self.core.name,
                dropped + 1
            ));
        }
    }

    /// Flush every appender of this context
    pub fn flush(&self) {
        self.core.flush_all();
    }

    /// Stop accepting records, drain the async queue and close appenders.
    ///
    /// Waits for in-flight synchronous writes to finish. Idempotent.
    pub fn stop(&self) {
        let sender = {
            let mut lifecycle = self.lifecycle.write();
            if lifecycle.state == EngineState::Stopped {
                return;
            }
            lifecycle.state = EngineState::Stopped;
            lifecycle.sender.take()
        };
        drop(sender);

        if let Some(handle) = self.worker.lock().take() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    if handle.join().is_err() {
                        self.core
                            .status
                            .error(&format!("Engine '{}' worker panicked", self.core.name));
                    }
                    break;
                }
                if start.elapsed() >= DEFAULT_SHUTDOWN_TIMEOUT {
                    self.core.status.warn(&format!(
                        "Engine '{}' worker did not finish within {:?}. Some records may be lost.",
                        self.core.name, DEFAULT_SHUTDOWN_TIMEOUT
                    ));
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }

        self.core.close_all();
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("id", &self.id)
            .field("name", &self.core.name)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StatusLogger;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{OnceLock, Weak};

    #[derive(Clone, Default)]
    struct Capture {
        lines: Arc<Mutex<Vec<String>>>,
        flushes: Arc<AtomicUsize>,
    }

    impl Appender for Capture {
        fn append(&mut self, record: &LogRecord) -> Result<()> {
            self.lines.lock().push(format!("{}:{}", record.level, record.message));
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.flushes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    struct Panicking;

    impl Appender for Panicking {
        fn append(&mut self, _record: &LogRecord) -> Result<()> {
            panic!("appender exploded");
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    /// Stops its own context from another thread mid-append, then reads
    /// the lifecycle again while the stop is waiting for the write lock.
    #[derive(Default)]
    struct StopsWhileWriting {
        ctx: Arc<OnceLock<Weak<EngineContext>>>,
        seen: Arc<Mutex<Vec<(EngineState, bool)>>>,
        stopper: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
    }

    impl Appender for StopsWhileWriting {
        fn append(&mut self, record: &LogRecord) -> Result<()> {
            let Some(ctx) = self.ctx.get().and_then(Weak::upgrade) else {
                return Ok(());
            };
            let stopping = Arc::clone(&ctx);
            *self.stopper.lock() = Some(thread::spawn(move || stopping.stop()));
            thread::sleep(Duration::from_millis(50));

            self.seen
                .lock()
                .push((ctx.state(), ctx.is_enabled(&record.channel, record.level)));
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "stops-while-writing"
        }
    }

    fn context(mode: EngineMode, appenders: Vec<Box<dyn Appender>>) -> (EngineContext, Arc<StatusLogger>) {
        let status = Arc::new(StatusLogger::quiet());
        let indices = (0..appenders.len()).collect();
        let ctx = EngineContext::new(
            "test",
            mode,
            16,
            ThresholdTree::new(LogLevel::Info, indices),
            appenders.into_iter().map(NamedAppender::new).collect(),
            status.clone(),
        );
        (ctx, status)
    }

    #[test]
    fn test_lifecycle() {
        let (ctx, _) = context(EngineMode::Sync, vec![]);
        assert_eq!(ctx.state(), EngineState::Initialized);
        assert!(!ctx.is_enabled("a", LogLevel::Fatal));

        ctx.start().unwrap();
        assert_eq!(ctx.state(), EngineState::Started);
        assert!(ctx.is_enabled("a", LogLevel::Info));
        assert!(!ctx.is_enabled("a", LogLevel::Debug));
        assert!(matches!(ctx.start(), Err(LoggerError::EngineState { .. })));

        ctx.stop();
        ctx.stop();
        assert_eq!(ctx.state(), EngineState::Stopped);
        assert!(!ctx.is_enabled("a", LogLevel::Fatal));
    }

    #[test]
    fn test_sync_dispatch() {
        let capture = Capture::default();
        let (ctx, _) = context(EngineMode::Sync, vec![Box::new(capture.clone())]);
        ctx.start().unwrap();

        assert!(ctx.dispatch(LogRecord::new("a", LogLevel::Warn, "hello")));
        assert_eq!(*capture.lines.lock(), vec!["WARN:hello".to_string()]);
        assert_eq!(ctx.stats().written(), 1);
    }

    #[test]
    fn test_dispatch_after_stop_is_dropped() {
        let capture = Capture::default();
        let (ctx, _) = context(EngineMode::Sync, vec![Box::new(capture.clone())]);
        ctx.start().unwrap();
        ctx.stop();

        assert!(!ctx.dispatch(LogRecord::new("a", LogLevel::Error, "late")));
        assert!(capture.lines.lock().is_empty());
        assert_eq!(ctx.stats().dropped(), 1);
    }

    #[test]
    fn test_async_dispatch_drains_on_stop() {
        let capture = Capture::default();
        let (ctx, _) = context(EngineMode::Async, vec![Box::new(capture.clone())]);
        ctx.start().unwrap();

        for i in 0..10 {
            ctx.dispatch(LogRecord::new("a", LogLevel::Info, format!("m{}", i)));
        }
        ctx.stop();

        let lines = capture.lines.lock();
        assert_eq!(lines.len() as u64 + ctx.stats().dropped(), 10);
        assert!(capture.flushes.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_panicking_appender_is_isolated() {
        let capture = Capture::default();
        let (ctx, status) = context(
            EngineMode::Sync,
            vec![Box::new(Panicking), Box::new(capture.clone())],
        );
        ctx.start().unwrap();

        assert!(ctx.dispatch(LogRecord::new("a", LogLevel::Error, "still delivered")));
        assert_eq!(capture.lines.lock().len(), 1);
        assert_eq!(ctx.stats().failed(), 1);
        assert!(status.contains(LogLevel::Error, "appender exploded"));
    }

    #[test]
    fn test_lifecycle_reads_inside_append_do_not_wait_for_stop() {
        let appender = StopsWhileWriting::default();
        let (slot, seen, stopper) = (
            appender.ctx.clone(),
            appender.seen.clone(),
            appender.stopper.clone(),
        );
        let (ctx, _) = context(EngineMode::Sync, vec![Box::new(appender)]);
        let ctx = Arc::new(ctx);
        slot.set(Arc::downgrade(&ctx)).unwrap();
        ctx.start().unwrap();

        assert!(ctx.dispatch(LogRecord::new("a", LogLevel::Info, "reentrant")));
        stopper.lock().take().unwrap().join().unwrap();

        assert_eq!(*seen.lock(), vec![(EngineState::Started, true)]);
        assert_eq!(ctx.state(), EngineState::Stopped);
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _) = context(EngineMode::Sync, vec![]);
        let (b, _) = context(EngineMode::Sync, vec![]);
        assert_ne!(a.id(), b.id());
    }
}
