//! Shipper configuration
//!
//! All numeric batching knobs accept zero, meaning "do not batch along this
//! dimension": a zero size, count or interval seals every record into its own
//! batch, and a zero queue size removes the bound on waiting batches.

use super::error::{LoggerError, Result};
use super::metadata::MetadataTags;
use super::overflow_policy::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the ingestion receiver, appended to the configured base URI
pub const RECEIVER_PATH: &str = "/services/receivers/token/";

/// Default shutdown timeout for draining pending batches (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_MAX_BATCH_SIZE_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MAX_BATCH_COUNT: usize = 100;
pub const DEFAULT_MAX_BATCH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Durations are written as integer milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Flush thresholds for the batch buffer and the delivery queue bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum body size of one batch in bytes
    pub max_batch_size_bytes: usize,
    /// Maximum number of records in one batch
    pub max_batch_count: usize,
    /// Maximum age of the oldest unsent record
    #[serde(with = "duration_ms")]
    pub max_batch_interval: Duration,
    /// Maximum number of sealed batches awaiting delivery
    pub max_queue_size: usize,
}

impl BatchConfig {
    /// Every event is shipped on its own as soon as it is sent
    pub fn immediate() -> Self {
        Self {
            max_batch_size_bytes: 0,
            max_batch_count: 0,
            max_batch_interval: Duration::ZERO,
            max_queue_size: 0,
        }
    }

    /// True when each record must be sealed into its own batch
    pub fn is_immediate(&self) -> bool {
        self.max_batch_size_bytes == 0
            || self.max_batch_count == 0
            || self.max_batch_interval.is_zero()
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size_bytes: DEFAULT_MAX_BATCH_SIZE_BYTES,
            max_batch_count: DEFAULT_MAX_BATCH_COUNT,
            max_batch_interval: DEFAULT_MAX_BATCH_INTERVAL,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

/// Retry behaviour for transient delivery failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per batch, including the first one
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub initial_backoff: Duration,
    #[serde(with = "duration_ms")]
    pub max_backoff: Duration,
    /// Add up to 10% random extra delay to each backoff
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            jitter: true,
        }
    }
}

/// Complete configuration of one shipper instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipperConfig {
    /// Base URI of the ingestion endpoint, e.g. `https://hec.example.com:8088`
    pub uri: String,
    pub token: String,
    pub batch: BatchConfig,
    pub metadata: MetadataTags,
    pub retry: RetryConfig,
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    /// Gzip request bodies
    pub compress: bool,
    pub overflow_policy: OverflowPolicy,
    #[serde(with = "duration_ms")]
    pub shutdown_timeout: Duration,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            token: String::new(),
            batch: BatchConfig::default(),
            metadata: MetadataTags::default(),
            retry: RetryConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            compress: false,
            overflow_policy: OverflowPolicy::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ShipperConfig {
    /// Positional constructor covering the four batching knobs.
    ///
    /// `max_batch_interval_ms` is in milliseconds. Passing zero for every knob
    /// gives synchronous-style per-event delivery.
    pub fn new(
        uri: impl Into<String>,
        token: impl Into<String>,
        max_batch_size_bytes: usize,
        max_batch_count: usize,
        max_batch_interval_ms: u64,
        max_queue_size: usize,
        metadata: MetadataTags,
    ) -> Self {
        Self {
            uri: uri.into(),
            token: token.into(),
            batch: BatchConfig {
                max_batch_size_bytes,
                max_batch_count,
                max_batch_interval: Duration::from_millis(max_batch_interval_ms),
                max_queue_size,
            },
            metadata,
            ..Self::default()
        }
    }

    /// Full receiver URL
    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.uri.trim_end_matches('/'), RECEIVER_PATH)
    }

    /// Value of the `Authorization` header sent with every request
    pub fn authorization(&self) -> String {
        format!("Splunk {}", self.token)
    }

    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(LoggerError::config("ShipperConfig", "uri must not be empty"));
        }
        if !(self.uri.starts_with("http://") || self.uri.starts_with("https://")) {
            return Err(LoggerError::config(
                "ShipperConfig",
                format!("uri '{}' must use http or https", self.uri),
            ));
        }
        if self.token.chars().any(char::is_control) {
            return Err(LoggerError::config(
                "ShipperConfig",
                "token must not contain control characters",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(LoggerError::config(
                "RetryConfig",
                "max_attempts must be at least 1",
            ));
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(LoggerError::config(
                "RetryConfig",
                "initial_backoff must not exceed max_backoff",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(LoggerError::config(
                "ShipperConfig",
                "request_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_normalizes_trailing_slash() {
        let mut config = ShipperConfig::new("http://localhost:5555", "T", 0, 0, 0, 0, MetadataTags::new());
        assert_eq!(
            config.endpoint_url(),
            "http://localhost:5555/services/receivers/token/"
        );

        config.uri = "http://localhost:5555/".to_string();
        assert_eq!(
            config.endpoint_url(),
            "http://localhost:5555/services/receivers/token/"
        );
    }

    #[test]
    fn test_authorization_header() {
        let config = ShipperConfig::new("http://localhost", "TOKEN", 0, 0, 0, 0, MetadataTags::new());
        assert_eq!(config.authorization(), "Splunk TOKEN");
    }

    #[test]
    fn test_zero_knobs_are_immediate() {
        let config = ShipperConfig::new("http://localhost", "T", 0, 0, 0, 0, MetadataTags::new());
        assert!(config.batch.is_immediate());
        assert_eq!(config.batch, BatchConfig::immediate());
        assert!(!BatchConfig::default().is_immediate());
    }

    #[test]
    fn test_validate() {
        let config = ShipperConfig::new("http://localhost", "T", 0, 0, 0, 0, MetadataTags::new());
        assert!(config.validate().is_ok());

        let empty = ShipperConfig::default();
        assert!(matches!(
            empty.validate(),
            Err(LoggerError::InvalidConfiguration { .. })
        ));

        let mut bad_scheme = config.clone();
        bad_scheme.uri = "ftp://localhost".to_string();
        assert!(bad_scheme.validate().is_err());

        let mut no_attempts = config.clone();
        no_attempts.retry.max_attempts = 0;
        assert!(no_attempts.validate().is_err());

        let mut bad_token = config;
        bad_token.token = "TO\nKEN".to_string();
        assert!(bad_token.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "uri": "https://hec.example.com:8088",
            "token": "abc",
            "batch": { "max_batch_count": 10, "max_batch_interval": 250 },
            "metadata": { "index": "main" }
        }"#;
        let config: ShipperConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.batch.max_batch_count, 10);
        assert_eq!(config.batch.max_batch_interval, Duration::from_millis(250));
        assert_eq!(config.batch.max_queue_size, DEFAULT_MAX_QUEUE_SIZE);
        assert_eq!(config.metadata.index.as_deref(), Some("main"));
        assert_eq!(config.retry, RetryConfig::default());
        assert!(config.validate().is_ok());
    }
}
