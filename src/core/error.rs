//! Error types for the log shipper

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// HTTP client error (connection refused, timeout, TLS, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Event could not be turned into a wire record
    #[error("Malformed event: {reason}")]
    MalformedEvent { reason: String },

    /// Endpoint answered with a status that is neither success nor retryable
    #[error("Unexpected HTTP status {status} from ingestion endpoint")]
    UnexpectedStatus { status: u16 },

    /// Queue overflow with dropped event count
    #[error("Delivery queue overflow: dropped {dropped_count} events")]
    QueueOverflow { dropped_count: u64 },

    /// Shipper already stopped
    #[error("Shipper already stopped")]
    ShipperStopped,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a malformed event error
    pub fn malformed(reason: impl Into<String>) -> Self {
        LoggerError::MalformedEvent {
            reason: reason.into(),
        }
    }

    /// Create a queue overflow error
    pub fn queue_overflow(dropped_count: u64) -> Self {
        LoggerError::QueueOverflow { dropped_count }
    }

    /// Whether a failed delivery attempt that produced this error may succeed later.
    ///
    /// Network-level failures are transient. Anything that describes the
    /// payload itself is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LoggerError::Http(e) => !e.is_builder() && !e.is_redirect(),
            LoggerError::Io(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::queue_overflow(10);
        assert!(matches!(err, LoggerError::QueueOverflow { .. }));

        let err = LoggerError::config("ShipperConfig", "empty uri");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::malformed("non-finite float");
        assert!(matches!(err, LoggerError::MalformedEvent { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::queue_overflow(3);
        assert_eq!(err.to_string(), "Delivery queue overflow: dropped 3 events");

        let err = LoggerError::config("ShipperConfig", "uri must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for ShipperConfig: uri must not be empty"
        );

        let err = LoggerError::UnexpectedStatus { status: 400 };
        assert_eq!(
            err.to_string(),
            "Unexpected HTTP status 400 from ingestion endpoint"
        );
    }

    #[test]
    fn test_retryable_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(LoggerError::from(io_err).is_retryable());
        assert!(!LoggerError::malformed("bad").is_retryable());
        assert!(!LoggerError::UnexpectedStatus { status: 401 }.is_retryable());
        assert!(!LoggerError::ShipperStopped.is_retryable());
    }
}
