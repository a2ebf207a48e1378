//! HTTP transport for the ingestion endpoint
//!
//! Posts newline-delimited JSON with a blocking `reqwest` client. The client
//! runs on the delivery worker thread only, so blocking here never reaches the
//! caller of `send`.

use crate::core::{IngestRequest, Result, ShipperConfig, Transport};
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use std::io::Write;
use std::time::Duration;

/// Transport posting batches over HTTP(S)
///
/// # Example
///
/// ```no_run
/// use http_input_logger::transports::HttpTransport;
/// use std::time::Duration;
///
/// let transport = HttpTransport::new(Duration::from_secs(10))
///     .expect("Failed to build HTTP client")
///     .with_compression(true);
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    compress: bool,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built (e.g. TLS backend failure)
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            compress: false,
        })
    }

    pub fn from_config(config: &ShipperConfig) -> Result<Self> {
        Ok(Self::new(config.request_timeout)?.with_compression(config.compress))
    }

    /// Gzip request bodies and send `Content-Encoding: gzip`
    ///
    /// Default: disabled
    #[must_use]
    pub fn with_compression(mut self, enable: bool) -> Self {
        self.compress = enable;
        self
    }

    fn gzip(body: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
        encoder.write_all(body)?;
        Ok(encoder.finish()?)
    }
}

impl Transport for HttpTransport {
    fn post(&self, request: &IngestRequest) -> Result<u16> {
        let mut builder = self
            .client
            .post(&request.url)
            .header(AUTHORIZATION, &request.authorization)
            .header(CONTENT_TYPE, "application/json");

        let body = if self.compress {
            builder = builder.header(CONTENT_ENCODING, "gzip");
            Self::gzip(&request.body)?
        } else {
            request.body.clone()
        };

        // The status line decides success; the response body is not read.
        let response = builder.body(body).send()?;
        Ok(response.status().as_u16())
    }

    fn name(&self) -> &str {
        "http"
    }
}
