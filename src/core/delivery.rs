//! Delivery worker: ships sealed batches and retries transient failures
//!
//! The worker owns a dedicated thread. It receives sealed batches over a
//! channel, posts each one, and keeps batches that failed transiently in a
//! retry queue until their backoff expires. Per batch:
//!
//! ```text
//! Pending -> InFlight -> Delivered
//!                     -> Retrying -> InFlight ...
//!                     -> Failed (dropped)
//! ```
//!
//! A retried batch can be delivered after batches sealed later than it.
//! Batches waiting for a retry count against the queue size together with the
//! batches still in the channel; the overflow policy sheds the excess.

use super::backoff::ExponentialBackoff;
use super::batch::Batch;
use super::config::{RetryConfig, ShipperConfig};
use super::error::{LoggerError, Result};
use super::metrics::ShipperMetrics;
use super::overflow_policy::{OverflowAlert, OverflowPolicy};
use super::transport::{AttemptOutcome, IngestRequest, Transport};
use crossbeam_channel::{never, select, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Longest the worker sleeps when it has nothing scheduled
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// State of a batch after a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Failed transiently, waiting in the retry queue
    Retrying,
    Delivered,
    Failed,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Delivered | BatchState::Failed)
    }
}

/// A batch owned by the worker, with its retry bookkeeping
#[derive(Debug)]
struct PendingBatch {
    id: u64,
    events: usize,
    request: IngestRequest,
    attempts: u32,
    backoff: ExponentialBackoff,
    due: Instant,
}

pub struct DeliveryWorker {
    transport: Box<dyn Transport>,
    url: String,
    authorization: String,
    retry: RetryConfig,
    metrics: Arc<ShipperMetrics>,
    retry_queue: Vec<PendingBatch>,
    /// Bound on retries plus queued batches, 0 for unbounded
    max_queue_size: usize,
    policy: OverflowPolicy,
    alert: OverflowAlert,
    deadline: Option<Instant>,
}

impl DeliveryWorker {
    pub fn new(
        transport: Box<dyn Transport>,
        config: &ShipperConfig,
        metrics: Arc<ShipperMetrics>,
    ) -> Self {
        Self {
            transport,
            url: config.endpoint_url(),
            authorization: config.authorization(),
            retry: config.retry.clone(),
            alert: OverflowAlert::new(Arc::clone(&metrics), None),
            metrics,
            retry_queue: Vec::new(),
            max_queue_size: config.batch.max_queue_size,
            policy: config.overflow_policy,
            deadline: None,
        }
    }

    /// Report shed retries through `alert` instead of a bare counter
    #[must_use]
    pub fn with_overflow_alert(mut self, alert: OverflowAlert) -> Self {
        self.alert = alert;
        self
    }

    /// Start the worker thread.
    ///
    /// The worker exits once `batches` is disconnected and every pending batch
    /// reached a terminal state, or when the deadline received on `shutdown`
    /// passes, abandoning whatever is still pending.
    pub fn spawn(
        self,
        batches: Receiver<Batch>,
        shutdown: Receiver<Instant>,
    ) -> Result<thread::JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("hec-delivery".to_string())
            .spawn(move || self.run(batches, shutdown))?;
        Ok(handle)
    }

    fn run(mut self, batches: Receiver<Batch>, shutdown: Receiver<Instant>) {
        let mut batches = batches;
        let mut shutdown = shutdown;
        let mut disconnected = false;

        loop {
            let now = Instant::now();
            if self.deadline.is_some_and(|deadline| now >= deadline) {
                self.abandon(&batches);
                break;
            }

            self.retry_due(now);
            self.shed_excess(batches.len());
            if disconnected && self.retry_queue.is_empty() {
                break;
            }
            if disconnected && self.retries_outlive_deadline() {
                self.abandon(&batches);
                break;
            }

            let timeout = self
                .next_wake()
                .map(|wake| wake.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT)
                .min(IDLE_WAIT);

            let mut batches_closed = false;
            let mut shutdown_seen = false;
            select! {
                recv(batches) -> msg => match msg {
                    Ok(batch) => {
                        self.deliver(batch);
                    }
                    Err(_) => batches_closed = true,
                },
                recv(shutdown) -> msg => {
                    if let Ok(deadline) = msg {
                        debug!("HEC | Draining pending batches before shutdown");
                        self.deadline = Some(deadline);
                    }
                    shutdown_seen = true;
                },
                default(timeout) => {}
            }

            if batches_closed {
                disconnected = true;
                batches = never();
            }
            if shutdown_seen {
                shutdown = never();
            }
        }

        debug!("HEC | Delivery worker stopped");
    }

    /// Make the first delivery attempt for a freshly sealed batch.
    pub fn deliver(&mut self, batch: Batch) -> BatchState {
        let pending = PendingBatch {
            id: batch.id(),
            events: batch.len(),
            request: IngestRequest {
                url: self.url.clone(),
                authorization: self.authorization.clone(),
                body: batch.body(),
            },
            attempts: 0,
            backoff: ExponentialBackoff::from(&self.retry),
            due: Instant::now(),
        };
        self.attempt(pending)
    }

    /// Batches waiting for their next attempt
    pub fn retry_queue_len(&self) -> usize {
        self.retry_queue.len()
    }

    fn attempt(&mut self, mut pending: PendingBatch) -> BatchState {
        pending.attempts += 1;

        let started = Instant::now();
        self.metrics.record_request();
        let result = self.transport.post(&pending.request);

        let state = match AttemptOutcome::from_result(&result) {
            AttemptOutcome::Delivered => {
                self.metrics.record_delivered(pending.events as u64);
                debug!(
                    "HEC | Delivered batch {} ({} events) in {} ms after {} attempt(s)",
                    pending.id,
                    pending.events,
                    started.elapsed().as_millis(),
                    pending.attempts
                );
                BatchState::Delivered
            }
            AttemptOutcome::Permanent => {
                self.metrics.record_failed();
                error!(
                    "HEC | Batch {} rejected by {}, dropping {} events: {}",
                    pending.id,
                    self.transport.name(),
                    pending.events,
                    describe(&result)
                );
                BatchState::Failed
            }
            AttemptOutcome::Transient if pending.attempts >= self.retry.max_attempts => {
                self.metrics.record_failed();
                error!(
                    "HEC | Failed to deliver batch {} after {} attempts, dropping {} events: {}",
                    pending.id,
                    pending.attempts,
                    pending.events,
                    describe(&result)
                );
                BatchState::Failed
            }
            AttemptOutcome::Transient => {
                let delay = pending.backoff.next_delay();
                match Instant::now().checked_add(delay) {
                    Some(due) => {
                        warn!(
                            "HEC | Attempt {} for batch {} failed ({}), retrying in {} ms",
                            pending.attempts,
                            pending.id,
                            describe(&result),
                            delay.as_millis()
                        );
                        self.metrics.record_retry();
                        pending.due = due;
                        BatchState::Retrying
                    }
                    None => {
                        self.metrics.record_failed();
                        error!(
                            "HEC | Backoff of {:?} for batch {} cannot be scheduled, dropping {} events: {}",
                            delay,
                            pending.id,
                            pending.events,
                            describe(&result)
                        );
                        BatchState::Failed
                    }
                }
            }
        };

        if state == BatchState::Retrying {
            self.retry_queue.push(pending);
        }
        state
    }

    /// Attempt every queued batch whose backoff has expired, earliest first.
    fn retry_due(&mut self, now: Instant) {
        loop {
            let next = self
                .retry_queue
                .iter()
                .enumerate()
                .filter(|(_, p)| p.due <= now)
                .min_by_key(|(_, p)| p.due)
                .map(|(idx, _)| idx);

            match next {
                Some(idx) => {
                    let pending = self.retry_queue.swap_remove(idx);
                    self.attempt(pending);
                }
                None => break,
            }
        }
    }

    /// Shed waiting retries until they fit beside `queued` channel batches.
    fn shed_excess(&mut self, queued: usize) {
        if self.max_queue_size == 0 {
            return;
        }

        while !self.retry_queue.is_empty()
            && self.retry_queue.len() + queued > self.max_queue_size
        {
            let ids = self.retry_queue.iter().enumerate().map(|(idx, p)| (p.id, idx));
            let victim = match self.policy {
                OverflowPolicy::DropOldest => ids.min(),
                OverflowPolicy::DropNewest => ids.max(),
            };
            let Some((_, idx)) = victim else {
                break;
            };

            let shed = self.retry_queue.swap_remove(idx);
            debug!(
                "HEC | Retry queue over capacity, shedding batch {} ({} events)",
                shed.id, shed.events
            );
            self.alert.drop_events(shed.events);
        }
    }

    fn next_wake(&self) -> Option<Instant> {
        let next_retry = self.retry_queue.iter().map(|p| p.due).min();
        match (next_retry, self.deadline) {
            (Some(retry), Some(deadline)) => Some(retry.min(deadline)),
            (retry, deadline) => retry.or(deadline),
        }
    }

    /// Every queued retry is scheduled after the shutdown deadline
    fn retries_outlive_deadline(&self) -> bool {
        match self.deadline {
            Some(deadline) => self.retry_queue.iter().all(|p| p.due > deadline),
            None => false,
        }
    }

    fn abandon(&mut self, batches: &Receiver<Batch>) {
        let queued: Vec<Batch> = batches.try_iter().collect();
        let abandoned = self.retry_queue.len() + queued.len();
        if abandoned == 0 {
            return;
        }

        let events: usize = self.retry_queue.iter().map(|p| p.events).sum::<usize>()
            + queued.iter().map(Batch::len).sum::<usize>();
        self.metrics.record_abandoned(abandoned as u64);
        warn!(
            "HEC | Shutdown timeout reached, abandoning {} batches ({} events)",
            abandoned, events
        );
        self.retry_queue.clear();
    }
}

fn describe(result: &Result<u16>) -> String {
    match result {
        Ok(status) => LoggerError::UnexpectedStatus { status: *status }.to_string(),
        Err(e) => e.to_string(),
    }
}
