//! Overflow policies for the delivery queue
//!
//! When more sealed batches are waiting than the configured queue size allows,
//! the policy decides which batch is shed. Neither policy ever blocks the
//! caller of `send`.

use super::error::LoggerError;
use super::metrics::ShipperMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Policy for handling delivery queue overflow
///
/// # Example
///
/// ```
/// use http_input_logger::OverflowPolicy;
///
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::DropOldest);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Evict the oldest queued batch to make room for the new one
    #[default]
    DropOldest,

    /// Discard the batch that was just sealed and keep the queue as is
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when events are dropped due to queue overflow.
/// The parameter is the total count of dropped events so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Counts shed events and raises the overflow alert.
///
/// Shared by every place that sheds batches: the dispatcher in front of the
/// delivery queue and the delivery worker's retry queue.
#[derive(Clone)]
pub struct OverflowAlert {
    metrics: Arc<ShipperMetrics>,
    callback: Option<OverflowCallback>,
}

impl OverflowAlert {
    pub fn new(metrics: Arc<ShipperMetrics>, callback: Option<OverflowCallback>) -> Self {
        Self { metrics, callback }
    }

    /// Count dropped events, alerting on the first drop and every 1000 thereafter
    pub fn drop_events(&self, events: usize) {
        let events = events as u64;
        let previous = self.metrics.record_dropped(events);
        let total = previous + events;

        if previous == 0 || previous / 1000 != total / 1000 {
            warn!(
                "HEC | {}. Consider raising max_queue_size or batch limits.",
                LoggerError::queue_overflow(total)
            );
            if let Some(ref callback) = self.callback {
                callback(total);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropOldest);
    }

    #[test]
    fn test_alert_fires_on_first_drop_and_each_thousand() {
        let metrics = Arc::new(ShipperMetrics::new());
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let alert = OverflowAlert::new(
            Arc::clone(&metrics),
            Some(Arc::new(move |total| seen.lock().push(total))),
        );

        alert.drop_events(10);
        alert.drop_events(500);
        alert.drop_events(500);
        alert.drop_events(5);

        assert_eq!(metrics.events_dropped(), 1015);
        assert_eq!(*calls.lock(), vec![10, 1010]);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "DropOldest");
    }
}
