//! # HTTP Input Logger
//!
//! A non-blocking log shipper that batches structured events and delivers
//! them to an HTTP event collector endpoint.
//!
//! ## Features
//!
//! - **Non-blocking**: `send` only serializes and appends; network I/O happens
//!   on a background thread
//! - **Batching**: Size, count and age thresholds, with a zero value meaning
//!   per-event delivery
//! - **Retry**: Exponential backoff for transient failures, bounded attempts
//! - **Back-pressure**: Oldest queued batch is shed when the queue is full

pub mod core;
pub mod macros;
pub mod transports;

pub mod prelude {
    pub use crate::core::{
        BatchConfig, Event, EventFields, EventId, FieldValue, HttpInputListener, ListenerBuilder,
        LoggerError, MetadataTags, OverflowCallback, OverflowPolicy, Result, RetryConfig,
        Severity, ShipperConfig, ShipperMetrics, Transport, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

pub use crate::core::{
    AttemptOutcome, Batch, BatchBuffer, BatchConfig, BatchState, DeliveryWorker, Event,
    EventFields, EventId, ExponentialBackoff, FieldValue, HttpInputListener, IngestRequest,
    ListenerBuilder, LoggerError, MetadataTags, OverflowCallback, OverflowPolicy, Record, Result,
    RetryConfig, Severity, ShipperConfig, ShipperMetrics, Transport, DEFAULT_SHUTDOWN_TIMEOUT,
    RECEIVER_PATH,
};
pub use crate::transports::{HttpTransport, MemoryTransport};
