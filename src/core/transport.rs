//! Transport trait for delivering batches to the ingestion endpoint

use super::error::Result;

/// One POST to the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRequest {
    pub url: String,
    /// Full `Authorization` header value (`Splunk <token>`)
    pub authorization: String,
    /// Newline-delimited JSON records
    pub body: Vec<u8>,
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Delivered,
    /// Retrying may succeed (network error, timeout, 5xx, 408, 429)
    Transient,
    /// Retrying cannot succeed (bad request, bad token, ...)
    Permanent,
}

impl AttemptOutcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => AttemptOutcome::Delivered,
            408 | 429 | 500..=599 => AttemptOutcome::Transient,
            _ => AttemptOutcome::Permanent,
        }
    }

    pub fn from_result(result: &Result<u16>) -> Self {
        match result {
            Ok(status) => Self::from_status(*status),
            Err(e) if e.is_retryable() => AttemptOutcome::Transient,
            Err(_) => AttemptOutcome::Permanent,
        }
    }
}

/// Delivers request bodies and reports the HTTP status of the response.
///
/// Only the status line decides success; response bodies are ignored.
/// Implementations are called from the delivery worker thread only.
pub trait Transport: Send + Sync {
    fn post(&self, request: &IngestRequest) -> Result<u16>;

    fn name(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn post(&self, request: &IngestRequest) -> Result<u16> {
        (**self).post(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoggerError;

    #[test]
    fn test_status_classification() {
        assert_eq!(AttemptOutcome::from_status(200), AttemptOutcome::Delivered);
        assert_eq!(AttemptOutcome::from_status(204), AttemptOutcome::Delivered);
        assert_eq!(AttemptOutcome::from_status(503), AttemptOutcome::Transient);
        assert_eq!(AttemptOutcome::from_status(429), AttemptOutcome::Transient);
        assert_eq!(AttemptOutcome::from_status(408), AttemptOutcome::Transient);
        assert_eq!(AttemptOutcome::from_status(400), AttemptOutcome::Permanent);
        assert_eq!(AttemptOutcome::from_status(403), AttemptOutcome::Permanent);
        assert_eq!(AttemptOutcome::from_status(302), AttemptOutcome::Permanent);
    }

    #[test]
    fn test_error_classification() {
        let io = LoggerError::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timed out",
        ));
        assert_eq!(AttemptOutcome::from_result(&Err(io)), AttemptOutcome::Transient);
        assert_eq!(
            AttemptOutcome::from_result(&Err(LoggerError::malformed("x"))),
            AttemptOutcome::Permanent
        );
    }
}
