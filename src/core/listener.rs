//! Listener facade: the synchronous, non-blocking entry point of the shipper

use super::{
    batch::{Batch, BatchBuffer},
    config::{BatchConfig, RetryConfig, ShipperConfig},
    delivery::DeliveryWorker,
    error::{LoggerError, Result},
    event::{Event, EventId},
    fields::EventFields,
    metadata::MetadataTags,
    metrics::ShipperMetrics,
    overflow_policy::{OverflowAlert, OverflowCallback, OverflowPolicy},
    record,
    severity::Severity,
    transport::Transport,
};
use crate::transports::HttpTransport;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Extra time granted to the worker thread past its drain deadline
/// to finish the request in flight.
const JOIN_GRACE: Duration = Duration::from_millis(100);

/// Longest the batch timer sleeps before re-checking the open batch
const MAX_TIMER_WAIT: Duration = Duration::from_secs(60);

/// Hands sealed batches to the delivery worker and applies the overflow policy.
///
/// Shared by the listener and the interval timer thread.
struct Dispatcher {
    sender: Sender<Batch>,
    /// Second receiving end, used only to evict the oldest queued batch
    evict: Receiver<Batch>,
    policy: OverflowPolicy,
    metrics: Arc<ShipperMetrics>,
    alert: OverflowAlert,
}

impl Dispatcher {
    fn dispatch(&self, batch: Batch) {
        self.metrics.record_sealed();

        match self.sender.try_send(batch) {
            Ok(()) => {}
            Err(TrySendError::Full(batch)) => self.handle_overflow(batch),
            Err(TrySendError::Disconnected(batch)) => {
                // Worker already gone (shutdown raced with the timer)
                self.alert.drop_events(batch.len());
            }
        }
    }

    fn handle_overflow(&self, batch: Batch) {
        match self.policy {
            OverflowPolicy::DropNewest => self.alert.drop_events(batch.len()),
            OverflowPolicy::DropOldest => {
                let mut pending = batch;
                loop {
                    if let Ok(oldest) = self.evict.try_recv() {
                        self.alert.drop_events(oldest.len());
                    }
                    match self.sender.try_send(pending) {
                        Ok(()) => break,
                        Err(TrySendError::Full(batch)) => pending = batch,
                        Err(TrySendError::Disconnected(batch)) => {
                            self.alert.drop_events(batch.len());
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Non-blocking log shipper.
///
/// `send` serializes the event, appends it to the open batch and returns.
/// Sealed batches travel to a background delivery thread; a second background
/// thread seals batches whose oldest record outlived the batch interval.
/// Nothing that happens downstream is reported back to the caller, only
/// through [`metrics`](Self::metrics) and `tracing` output.
///
/// # Example
///
/// ```no_run
/// use http_input_logger::prelude::*;
///
/// let listener = HttpInputListener::builder()
///     .uri("https://hec.example.com:8088")
///     .token("TOKEN")
///     .index("main")
///     .source("localhost")
///     .sourcetype("log")
///     .build()
///     .expect("valid configuration");
///
/// listener.send(Severity::Error, 123, "Test error");
/// ```
pub struct HttpInputListener {
    tags: Arc<MetadataTags>,
    buffer: Arc<Mutex<BatchBuffer>>,
    dispatcher: Option<Arc<Dispatcher>>,
    metrics: Arc<ShipperMetrics>,
    closed: AtomicBool,
    worker_handle: Option<thread::JoinHandle<()>>,
    timer_handle: Option<thread::JoinHandle<()>>,
    timer_stop: Option<Sender<()>>,
    shutdown_tx: Option<Sender<Instant>>,
    shutdown_timeout: Duration,
}

impl HttpInputListener {
    /// Create a listener posting over HTTP to `config.uri`
    pub fn new(config: ShipperConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;
        Self::with_transport(config, Box::new(transport), None)
    }

    /// Create a listener delivering through a custom transport
    pub fn with_transport(
        config: ShipperConfig,
        transport: Box<dyn Transport>,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        config.validate()?;

        let metrics = Arc::new(ShipperMetrics::new());
        let (sender, receiver) = if config.batch.max_queue_size == 0 {
            unbounded()
        } else {
            bounded(config.batch.max_queue_size)
        };
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let alert = OverflowAlert::new(Arc::clone(&metrics), on_overflow);
        let worker = DeliveryWorker::new(transport, &config, Arc::clone(&metrics))
            .with_overflow_alert(alert.clone());
        let worker_handle = worker.spawn(receiver.clone(), shutdown_rx)?;

        let dispatcher = Arc::new(Dispatcher {
            sender,
            evict: receiver,
            policy: config.overflow_policy,
            metrics: Arc::clone(&metrics),
            alert,
        });
        let buffer = Arc::new(Mutex::new(BatchBuffer::new(config.batch.clone())));

        let (timer_stop, timer_handle) = if config.batch.is_immediate() {
            (None, None)
        } else {
            let (stop_tx, stop_rx) = bounded::<()>(1);
            let handle = Self::spawn_timer(
                Arc::clone(&buffer),
                Arc::clone(&dispatcher),
                config.batch.max_batch_interval,
                stop_rx,
            )?;
            (Some(stop_tx), Some(handle))
        };

        debug!(
            "HEC | Shipping to {} (batch: {} bytes / {} records / {:?}, queue: {})",
            config.endpoint_url(),
            config.batch.max_batch_size_bytes,
            config.batch.max_batch_count,
            config.batch.max_batch_interval,
            config.batch.max_queue_size
        );

        Ok(Self {
            tags: Arc::new(config.metadata),
            buffer,
            dispatcher: Some(dispatcher),
            metrics,
            closed: AtomicBool::new(false),
            worker_handle: Some(worker_handle),
            timer_handle,
            timer_stop,
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Background timer sealing batches whose oldest record reached `interval`
    fn spawn_timer(
        buffer: Arc<Mutex<BatchBuffer>>,
        dispatcher: Arc<Dispatcher>,
        interval: Duration,
        stop: Receiver<()>,
    ) -> Result<thread::JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("hec-batch-timer".to_string())
            .spawn(move || loop {
                let wait = buffer
                    .lock()
                    .deadline()
                    .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                    .unwrap_or(interval)
                    .min(MAX_TIMER_WAIT);

                match stop.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        let sealed = buffer.lock().seal_if_expired(Instant::now());
                        if let Some(batch) = sealed {
                            dispatcher.dispatch(batch);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(handle)
    }

    /// Ship an event built from its parts, timestamped now.
    #[inline]
    pub fn send(&self, severity: Severity, id: impl Into<EventId>, message: impl AsRef<str>) {
        self.send_event(Event::new(severity, id, message));
    }

    /// Ship a prepared event.
    ///
    /// Never blocks beyond the short buffer critical section and never fails:
    /// malformed events and overflow are only counted.
    pub fn send_event(&self, event: Event) {
        if self.closed.load(Ordering::Acquire) {
            debug!("HEC | Ignoring event {}: {}", event.id(), LoggerError::ShipperStopped);
            return;
        }

        // Serialize outside the lock to keep the critical section short
        let record = match record::serialize(&event, &self.tags) {
            Ok(record) => record,
            Err(e) => {
                self.metrics.record_malformed();
                warn!("HEC | Dropping event {}: {}", event.id(), e);
                return;
            }
        };
        self.metrics.record_enqueued();

        let sealed = self.buffer.lock().push(record);
        if let Some(ref dispatcher) = self.dispatcher {
            for batch in sealed {
                dispatcher.dispatch(batch);
            }
        }
    }

    /// Ship a trace event; same as [`send`](Self::send)
    pub fn trace_event(&self, severity: Severity, id: impl Into<EventId>, message: impl AsRef<str>) {
        self.send(severity, id, message);
    }

    /// Ship a trace event carrying extra structured fields
    pub fn trace_event_with_fields(
        &self,
        severity: Severity,
        id: impl Into<EventId>,
        message: impl AsRef<str>,
        fields: EventFields,
    ) {
        self.send_event(Event::new(severity, id, message).with_fields(fields));
    }

    /// Ship a plain message as an `Information` event with id 0
    pub fn write(&self, message: impl AsRef<str>) {
        self.send(Severity::Information, 0, message);
    }

    /// Ship a `Critical` event with id 0
    #[inline]
    pub fn critical(&self, message: impl AsRef<str>) {
        self.send(Severity::Critical, 0, message);
    }

    /// Ship an `Error` event with id 0
    #[inline]
    pub fn error(&self, message: impl AsRef<str>) {
        self.send(Severity::Error, 0, message);
    }

    /// Ship a `Warning` event with id 0
    #[inline]
    pub fn warning(&self, message: impl AsRef<str>) {
        self.send(Severity::Warning, 0, message);
    }

    /// Ship an `Information` event with id 0
    #[inline]
    pub fn information(&self, message: impl AsRef<str>) {
        self.send(Severity::Information, 0, message);
    }

    /// Ship a `Verbose` event with id 0
    #[inline]
    pub fn verbose(&self, message: impl AsRef<str>) {
        self.send(Severity::Verbose, 0, message);
    }

    /// Seal the open batch now and hand it to the delivery worker.
    ///
    /// Does not wait for delivery.
    pub fn flush(&self) {
        let sealed = self.buffer.lock().seal();
        if let (Some(batch), Some(dispatcher)) = (sealed, self.dispatcher.as_ref()) {
            dispatcher.dispatch(batch);
        }
    }

    /// Metadata tags attached to every record
    pub fn tags(&self) -> &MetadataTags {
        &self.tags
    }

    /// Events waiting in the open batch
    pub fn pending_events(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Whether shutdown has begun and new events are ignored
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Events dropped because the delivery queue overflowed
    pub fn dropped_count(&self) -> u64 {
        self.metrics.events_dropped()
    }

    /// Get the shipper metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```no_run
    /// use http_input_logger::prelude::*;
    ///
    /// let listener = HttpInputListener::builder()
    ///     .uri("http://localhost:8088")
    ///     .token("TOKEN")
    ///     .build()
    ///     .unwrap();
    ///
    /// let metrics = listener.metrics();
    /// println!("Delivered: {}", metrics.events_delivered());
    /// println!("Dropped: {}", metrics.events_dropped());
    /// println!("Failed batches: {}", metrics.batches_failed());
    /// ```
    pub fn metrics(&self) -> &ShipperMetrics {
        &self.metrics
    }

    /// Stop accepting events and drain pending batches within `timeout`.
    ///
    /// The open batch is sealed, the worker gets until `timeout` to deliver
    /// everything it holds, and whatever is left after that is abandoned.
    ///
    /// # Returns
    ///
    /// `true` if the worker finished within the timeout, `false` otherwise.
    /// A timeout too large to represent waits for the worker without a deadline.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        self.closed.store(true, Ordering::Release);

        drop(self.timer_stop.take());
        if let Some(handle) = self.timer_handle.take() {
            if handle.join().is_err() {
                warn!("HEC | Batch timer thread panicked");
            }
        }

        self.flush();

        // A timeout too large to represent means no deadline at all
        let deadline = Instant::now().checked_add(timeout);
        if let (Some(tx), Some(deadline)) = (self.shutdown_tx.take(), deadline) {
            let _ = tx.send(deadline);
        }
        // Last sender gone: the worker exits once the queue is drained
        drop(self.dispatcher.take());

        let Some(handle) = self.worker_handle.take() else {
            return true;
        };

        let give_up = deadline.and_then(|deadline| deadline.checked_add(JOIN_GRACE));
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    warn!("HEC | Delivery worker panicked during shutdown");
                    return false;
                }
                break;
            }

            if give_up.is_some_and(|give_up| Instant::now() >= give_up) {
                warn!(
                    "HEC | Delivery worker did not finish within {:?}. Some events may be lost.",
                    timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(5));
        }

        let dropped = self.metrics.events_dropped();
        if dropped > 0 {
            warn!(
                "HEC | Shipper stopped with {} dropped events (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
        true
    }
}

impl Drop for HttpInputListener {
    fn drop(&mut self) {
        if self.worker_handle.is_some() {
            self.shutdown(self.shutdown_timeout);
        }
    }
}

/// Builder for constructing an [`HttpInputListener`] with named knobs
///
/// # Example
/// ```
/// use http_input_logger::prelude::*;
/// use http_input_logger::transports::MemoryTransport;
/// use std::time::Duration;
///
/// let listener = HttpInputListener::builder()
///     .uri("http://localhost:5555")
///     .token("TOKEN")
///     .max_batch_count(50)
///     .max_batch_interval(Duration::from_millis(200))
///     .index("main")
///     .transport(MemoryTransport::new())
///     .build()
///     .unwrap();
///
/// listener.information("service started");
/// ```
pub struct ListenerBuilder {
    config: ShipperConfig,
    transport: Option<Box<dyn Transport>>,
    on_overflow: Option<OverflowCallback>,
}

impl ListenerBuilder {
    pub fn new() -> Self {
        Self {
            config: ShipperConfig::default(),
            transport: None,
            on_overflow: None,
        }
    }

    /// Start from a complete configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: ShipperConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config.uri = uri.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = token.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_batch_size_bytes(mut self, bytes: usize) -> Self {
        self.config.batch.max_batch_size_bytes = bytes;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_batch_count(mut self, count: usize) -> Self {
        self.config.batch.max_batch_count = count;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_batch_interval(mut self, interval: Duration) -> Self {
        self.config.batch.max_batch_interval = interval;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_queue_size(mut self, batches: usize) -> Self {
        self.config.batch.max_queue_size = batches;
        self
    }

    /// Ship every event on its own, as soon as it is sent
    #[must_use = "builder methods return a new value"]
    pub fn immediate(mut self) -> Self {
        self.config.batch = BatchConfig::immediate();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn metadata(mut self, tags: MetadataTags) -> Self {
        self.config.metadata = tags;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.config.metadata.index = Some(index.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.config.metadata.source = Some(source.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sourcetype(mut self, sourcetype: impl Into<String>) -> Self {
        self.config.metadata.sourcetype = Some(sourcetype.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Gzip request bodies (HTTP transport only)
    #[must_use = "builder methods return a new value"]
    pub fn compress(mut self, enable: bool) -> Self {
        self.config.compress = enable;
        self
    }

    /// Set the overflow policy for the delivery queue
    ///
    /// Default is `DropOldest`.
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The parameter is the total count of dropped events.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Timeout used when the listener is dropped without an explicit shutdown
    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Deliver through a custom transport instead of HTTP
    #[must_use = "builder methods return a new value"]
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Validate the configuration and start the background threads
    pub fn build(self) -> Result<HttpInputListener> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::from_config(&self.config)?),
        };
        HttpInputListener::with_transport(self.config, transport, self.on_overflow)
    }
}

impl Default for ListenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpInputListener {
    /// Create a builder for HttpInputListener
    #[must_use]
    pub fn builder() -> ListenerBuilder {
        ListenerBuilder::new()
    }
}
