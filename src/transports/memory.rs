//! In-memory stub endpoint
//!
//! Records every request instead of sending it and answers with scripted
//! statuses. Used to verify what the shipper puts on the wire without a
//! network listener.

use crate::core::{IngestRequest, LoggerError, Result, Transport};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Scripted reply for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubResponse {
    Status(u16),
    /// Fail as if the connection was refused
    ConnectionError,
}

/// Transport that keeps requests in memory
///
/// # Example
///
/// ```
/// use http_input_logger::transports::MemoryTransport;
/// use http_input_logger::{IngestRequest, Transport};
///
/// let transport = MemoryTransport::new();
/// transport.push_status(503);
///
/// let request = IngestRequest {
///     url: "http://localhost/services/receivers/token/".to_string(),
///     authorization: "Splunk TOKEN".to_string(),
///     body: b"{}\n".to_vec(),
/// };
/// assert_eq!(transport.post(&request).unwrap(), 503);
/// assert_eq!(transport.post(&request).unwrap(), 200);
/// assert_eq!(transport.request_count(), 2);
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    requests: Mutex<Vec<IngestRequest>>,
    arrived: Condvar,
    script: Mutex<VecDeque<StubResponse>>,
    default_response: StubResponse,
    latency: Duration,
}

impl MemoryTransport {
    /// A stub that accepts everything with `200`
    pub fn new() -> Self {
        Self::with_default(StubResponse::Status(200))
    }

    /// A stub answering `default` once the script is exhausted
    pub fn with_default(default: StubResponse) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
            script: Mutex::new(VecDeque::new()),
            default_response: default,
            latency: Duration::ZERO,
        }
    }

    /// Delay every response, simulating a slow endpoint
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a status for the next unscripted request
    pub fn push_status(&self, status: u16) {
        self.script.lock().push_back(StubResponse::Status(status));
    }

    pub fn push_connection_error(&self) {
        self.script.lock().push_back(StubResponse::ConnectionError);
    }

    /// Queue the same status `times` times
    pub fn fail_times(&self, status: u16, times: usize) {
        let mut script = self.script.lock();
        for _ in 0..times {
            script.push_back(StubResponse::Status(status));
        }
    }

    pub fn requests(&self) -> Vec<IngestRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every record of every request, parsed, in arrival order
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.requests
            .lock()
            .iter()
            .flat_map(|request| {
                request
                    .body
                    .split(|b| *b == b'\n')
                    .filter(|line| !line.is_empty())
                    .filter_map(|line| serde_json::from_slice(line).ok())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Block until at least `count` requests arrived or `timeout` elapsed.
    pub fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut requests = self.requests.lock();
        while requests.len() < count {
            match deadline {
                Some(deadline) => {
                    if self.arrived.wait_until(&mut requests, deadline).timed_out() {
                        return requests.len() >= count;
                    }
                }
                None => self.arrived.wait(&mut requests),
            }
        }
        true
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn post(&self, request: &IngestRequest) -> Result<u16> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let response = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(self.default_response);

        {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            self.arrived.notify_all();
        }

        match response {
            StubResponse::Status(status) => Ok(status),
            StubResponse::ConnectionError => Err(LoggerError::from(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "stub endpoint refused the connection",
            ))),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> IngestRequest {
        IngestRequest {
            url: "http://localhost/services/receivers/token/".to_string(),
            authorization: "Splunk T".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_script_then_default() {
        let transport = MemoryTransport::with_default(StubResponse::Status(500));
        transport.push_status(200);

        assert_eq!(transport.post(&request("{}\n")).unwrap(), 200);
        assert_eq!(transport.post(&request("{}\n")).unwrap(), 500);
    }

    #[test]
    fn test_connection_error_is_retryable() {
        let transport = MemoryTransport::new();
        transport.push_connection_error();

        let err = transport.post(&request("{}\n")).unwrap_err();
        assert!(err.is_retryable());
        // failed attempts are still recorded
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_records_parses_each_line() {
        let transport = MemoryTransport::new();
        transport.post(&request("{\"n\":1}\n{\"n\":2}\n")).unwrap();
        transport.post(&request("{\"n\":3}\n")).unwrap();

        let records = transport.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["n"], 3);
    }

    #[test]
    fn test_wait_for_requests_times_out() {
        let transport = MemoryTransport::new();
        assert!(!transport.wait_for_requests(1, Duration::from_millis(20)));
        transport.post(&request("{}\n")).unwrap();
        assert!(transport.wait_for_requests(1, Duration::from_millis(20)));
    }
}
