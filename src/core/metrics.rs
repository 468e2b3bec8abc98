//! Routing metrics for observability
//!
//! Counters for accepted and filtered records, fallback deliveries, event
//! fan-out and reconfiguration outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the routing service
///
/// # Example
///
/// ```
/// use rust_logging_service::RoutingMetrics;
///
/// let metrics = RoutingMetrics::new();
/// metrics.record_accepted();
/// metrics.record_filtered();
///
/// assert_eq!(metrics.accepted(), 1);
/// assert_eq!(metrics.acceptance_rate(), 50.0);
/// ```
#[derive(Debug)]
pub struct RoutingMetrics {
    /// Records that passed the active threshold
    accepted: AtomicU64,

    /// Records rejected by the active threshold
    filtered: AtomicU64,

    /// Records delivered through the fallback logger
    fallback: AtomicU64,

    /// Events handed to the asynchronous poster
    events_posted: AtomicU64,

    /// Events the poster could not queue
    events_dropped: AtomicU64,

    /// Engine contexts built and published
    reconfigurations: AtomicU64,

    /// Reconfiguration attempts whose build failed
    configuration_failures: AtomicU64,
}

impl RoutingMetrics {
    pub const fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            fallback: AtomicU64::new(0),
            events_posted: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            reconfigurations: AtomicU64::new(0),
            configuration_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn fallback(&self) -> u64 {
        self.fallback.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_posted(&self) -> u64 {
        self.events_posted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reconfigurations(&self) -> u64 {
        self.reconfigurations.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn configuration_failures(&self) -> u64 {
        self.configuration_failures.load(Ordering::Relaxed)
    }

    /// Each `record_*` returns the previous value
    #[inline]
    pub fn record_accepted(&self) -> u64 {
        self.accepted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_fallback(&self) -> u64 {
        self.fallback.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_event_posted(&self) -> u64 {
        self.events_posted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_event_dropped(&self) -> u64 {
        self.events_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_reconfiguration(&self) -> u64 {
        self.reconfigurations.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_configuration_failure(&self) -> u64 {
        self.configuration_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of threshold decisions that accepted the record (0.0 - 100.0)
    pub fn acceptance_rate(&self) -> f64 {
        let accepted = self.accepted() as f64;
        let total = accepted + self.filtered() as f64;
        if total == 0.0 {
            0.0
        } else {
            (accepted / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.accepted.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.fallback.store(0, Ordering::Relaxed);
        self.events_posted.store(0, Ordering::Relaxed);
        self.events_dropped.store(0, Ordering::Relaxed);
        self.reconfigurations.store(0, Ordering::Relaxed);
        self.configuration_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for RoutingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RoutingMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            accepted: AtomicU64::new(self.accepted()),
            filtered: AtomicU64::new(self.filtered()),
            fallback: AtomicU64::new(self.fallback()),
            events_posted: AtomicU64::new(self.events_posted()),
            events_dropped: AtomicU64::new(self.events_dropped()),
            reconfigurations: AtomicU64::new(self.reconfigurations()),
            configuration_failures: AtomicU64::new(self.configuration_failures()),
        }
    }
}
