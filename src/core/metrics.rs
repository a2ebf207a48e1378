//! Shipper metrics for observability
//!
//! Delivery never reports failures to the caller, so these counters (and the
//! `tracing` output) are the only place dropped or failed events show up.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing shipper health
///
/// # Example
///
/// ```
/// use http_input_logger::ShipperMetrics;
///
/// let metrics = ShipperMetrics::new();
///
/// metrics.record_enqueued();
/// metrics.record_dropped(3);
///
/// assert_eq!(metrics.events_enqueued(), 1);
/// assert_eq!(metrics.events_dropped(), 3);
/// ```
#[derive(Debug)]
pub struct ShipperMetrics {
    /// Events accepted by `send`
    events_enqueued: AtomicU64,

    /// Events dropped because the delivery queue overflowed
    events_dropped: AtomicU64,

    /// Events rejected at serialization time
    events_malformed: AtomicU64,

    /// Events contained in batches the endpoint accepted
    events_delivered: AtomicU64,

    batches_sealed: AtomicU64,
    batches_delivered: AtomicU64,

    /// Batches dropped after a permanent error or exhausted retries
    batches_failed: AtomicU64,

    /// Batches still pending when the shutdown timeout expired
    batches_abandoned: AtomicU64,

    /// Delivery attempts scheduled after a transient failure
    retries: AtomicU64,

    requests_sent: AtomicU64,
}

impl ShipperMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            events_enqueued: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_malformed: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            batches_sealed: AtomicU64::new(0),
            batches_delivered: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            batches_abandoned: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            requests_sent: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn events_enqueued(&self) -> u64 {
        self.events_enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_malformed(&self) -> u64 {
        self.events_malformed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_sealed(&self) -> u64 {
        self.batches_sealed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_delivered(&self) -> u64 {
        self.batches_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_abandoned(&self) -> u64 {
        self.batches_abandoned.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record `count` events lost to overflow, returning the previous total
    #[inline]
    pub fn record_dropped(&self, count: u64) -> u64 {
        self.events_dropped.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_malformed(&self) -> u64 {
        self.events_malformed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sealed(&self) -> u64 {
        self.batches_sealed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self, events: u64) -> u64 {
        self.events_delivered.fetch_add(events, Ordering::Relaxed);
        self.batches_delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.batches_failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_abandoned(&self, batches: u64) -> u64 {
        self.batches_abandoned.fetch_add(batches, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_retry(&self) -> u64 {
        self.retries.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_request(&self) -> u64 {
        self.requests_sent.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of accepted events lost to overflow, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been enqueued.
    pub fn drop_rate(&self) -> f64 {
        let enqueued = self.events_enqueued() as f64;
        if enqueued == 0.0 {
            0.0
        } else {
            (self.events_dropped() as f64 / enqueued) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.events_enqueued.store(0, Ordering::Relaxed);
        self.events_dropped.store(0, Ordering::Relaxed);
        self.events_malformed.store(0, Ordering::Relaxed);
        self.events_delivered.store(0, Ordering::Relaxed);
        self.batches_sealed.store(0, Ordering::Relaxed);
        self.batches_delivered.store(0, Ordering::Relaxed);
        self.batches_failed.store(0, Ordering::Relaxed);
        self.batches_abandoned.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.requests_sent.store(0, Ordering::Relaxed);
    }
}

impl Default for ShipperMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ShipperMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            events_enqueued: AtomicU64::new(self.events_enqueued()),
            events_dropped: AtomicU64::new(self.events_dropped()),
            events_malformed: AtomicU64::new(self.events_malformed()),
            events_delivered: AtomicU64::new(self.events_delivered()),
            batches_sealed: AtomicU64::new(self.batches_sealed()),
            batches_delivered: AtomicU64::new(self.batches_delivered()),
            batches_failed: AtomicU64::new(self.batches_failed()),
            batches_abandoned: AtomicU64::new(self.batches_abandoned()),
            retries: AtomicU64::new(self.retries()),
            requests_sent: AtomicU64::new(self.requests_sent()),
        }
    }
}
