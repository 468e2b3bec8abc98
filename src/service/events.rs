//! Asynchronous log event fan-out
//!
//! Accepted records are posted as [`LogEvent`]s onto a bounded queue and
//! delivered to subscribed handlers by a dedicated worker thread, so a
//! slow handler never stalls a log call. Delivery is best effort: when the
//! queue is full the event is dropped and counted.

use crate::core::{
    ErrorCause, LogContext, LogLevel, LogRecord, LoggerError, ModuleId, Result, RoutingMetrics,
    StatusSink, LEGACY_DEBUG, LEGACY_ERROR, LEGACY_INFO, LEGACY_WARNING,
};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Topic prefix shared by all log events
pub const EVENT_TOPIC_PREFIX: &str = "log/entry/";

/// Default capacity of the event queue
pub const DEFAULT_EVENT_QUEUE: usize = 1024;

/// Event topic for a level, following its legacy code
pub fn topic_for(level: LogLevel) -> &'static str {
    match level.legacy_code() {
        LEGACY_ERROR => "log/entry/LOG_ERROR",
        LEGACY_WARNING => "log/entry/LOG_WARNING",
        LEGACY_INFO => "log/entry/LOG_INFO",
        LEGACY_DEBUG => "log/entry/LOG_DEBUG",
        _ => "log/entry/LOG_OTHER",
    }
}

/// Copy of an accepted record as seen by event handlers
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub topic: &'static str,
    pub timestamp: DateTime<Utc>,
    pub module: Option<ModuleId>,
    pub level: LogLevel,
    pub legacy_level: i32,
    pub message: String,
    pub cause: Option<ErrorCause>,
    /// Description of the object the record was logged on behalf of
    pub origin: Option<String>,
    /// Diagnostic context at acceptance
    pub context: LogContext,
    pub record: LogRecord,
}

impl LogEvent {
    pub fn new(record: LogRecord, origin: Option<&str>, context: LogContext) -> Self {
        Self {
            topic: topic_for(record.level),
            timestamp: record.timestamp,
            module: record.module.clone(),
            level: record.level,
            legacy_level: record.level.legacy_code(),
            message: record.message.clone(),
            cause: record.cause.clone(),
            origin: origin.map(String::from),
            context,
            record,
        }
    }
}

pub trait LogEventHandler: Send + Sync {
    fn handle_event(&self, event: &LogEvent);
}

type Handlers = Arc<RwLock<Vec<(u64, Arc<dyn LogEventHandler>)>>>;

/// Queue-and-return event poster with a single delivery thread.
pub struct AsyncEventPoster {
    sender: RwLock<Option<Sender<LogEvent>>>,
    handlers: Handlers,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    next_handler_id: AtomicU64,
    delivered: Arc<AtomicU64>,
    metrics: Arc<RoutingMetrics>,
    status: Arc<dyn StatusSink>,
}

impl AsyncEventPoster {
    pub fn new(
        capacity: usize,
        status: Arc<dyn StatusSink>,
        metrics: Arc<RoutingMetrics>,
    ) -> Result<Self> {
        let (sender, receiver) = bounded(capacity.max(1));
        let handlers: Handlers = Arc::new(RwLock::new(Vec::new()));
        let delivered = Arc::new(AtomicU64::new(0));

        let worker = {
            let handlers = Arc::clone(&handlers);
            let delivered = Arc::clone(&delivered);
            let status = Arc::clone(&status);
            thread::Builder::new()
                .name("log-event-poster".to_string())
                .spawn(move || Self::run_worker(receiver, handlers, delivered, status))
                .map_err(|e| LoggerError::worker_spawn("event poster", e))?
        };

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            handlers,
            worker: Mutex::new(Some(worker)),
            next_handler_id: AtomicU64::new(1),
            delivered,
            metrics,
            status,
        })
    }

    fn run_worker(
        receiver: Receiver<LogEvent>,
        handlers: Handlers,
        delivered: Arc<AtomicU64>,
        status: Arc<dyn StatusSink>,
    ) {
        for event in receiver {
            let current: Vec<Arc<dyn LogEventHandler>> =
                handlers.read().iter().map(|(_, h)| Arc::clone(h)).collect();

            for handler in current {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    handler.handle_event(&event)
                }));
                if result.is_err() {
                    status.error(&format!(
                        "Event handler panicked on '{}'. Other handlers continue to receive events.",
                        event.topic
                    ));
                }
            }
            delivered.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Subscribe a handler; returns an id for [`AsyncEventPoster::unsubscribe`]
    pub fn subscribe(&self, handler: Arc<dyn LogEventHandler>) -> u64 {
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.write().push((id, handler));
        id
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Events fully handed to every handler
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Queue an event for `record` and return immediately.
    ///
    /// Returns `false` when nothing is subscribed, the queue is full, or
    /// the poster was shut down.
    pub fn post(&self, record: LogRecord, origin: Option<&str>, context: LogContext) -> bool {
        if self.handlers.read().is_empty() {
            return false;
        }

        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            return false;
        };

        match sender.try_send(LogEvent::new(record, origin, context)) {
            Ok(()) => {
                self.metrics.record_event_posted();
                true
            }
            Err(TrySendError::Full(event)) => {
                let dropped = self.metrics.record_event_dropped();
                if dropped == 0 || (dropped + 1) % 1000 == 0 {
                    self.status.warn(&format!(
                        "Event queue full, dropped '{}' event ({} dropped so far).",
                        event.topic,
                        dropped + 1
                    ));
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_event_dropped();
                false
            }
        }
    }

    /// Stop accepting events and wait up to `timeout` for queued events to
    /// be delivered. Idempotent.
    pub fn shutdown(&self, timeout: Duration) {
        drop(self.sender.write().take());

        if let Some(handle) = self.worker.lock().take() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    if handle.join().is_err() {
                        self.status.error("Event poster worker panicked");
                    }
                    break;
                }
                if start.elapsed() >= timeout {
                    self.status.warn(&format!(
                        "Event poster did not drain within {:?}. Some events may be lost.",
                        timeout
                    ));
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

impl Drop for AsyncEventPoster {
    fn drop(&mut self) {
        self.shutdown(crate::engine::DEFAULT_SHUTDOWN_TIMEOUT);
    }
}
