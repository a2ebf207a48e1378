//! Core shipper types and traits

pub mod backoff;
pub mod batch;
pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod fields;
pub mod listener;
pub mod metadata;
pub mod metrics;
pub mod overflow_policy;
pub mod record;
pub mod severity;
pub mod transport;

pub use backoff::ExponentialBackoff;
pub use batch::{Batch, BatchBuffer};
pub use config::{BatchConfig, RetryConfig, ShipperConfig, DEFAULT_SHUTDOWN_TIMEOUT, RECEIVER_PATH};
pub use delivery::{BatchState, DeliveryWorker};
pub use error::{LoggerError, Result};
pub use event::{Event, EventId};
pub use fields::{EventFields, FieldValue};
pub use listener::{HttpInputListener, ListenerBuilder};
pub use metadata::MetadataTags;
pub use metrics::ShipperMetrics;
pub use overflow_policy::{OverflowAlert, OverflowCallback, OverflowPolicy};
pub use record::{serialize, Record};
pub use severity::Severity;
pub use transport::{AttemptOutcome, IngestRequest, Transport};
