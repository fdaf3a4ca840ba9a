//! Transport seam: opening the byte stream for a turn.
//!
//! The streaming engine only needs a stream of byte chunks. How the request
//! is made (URL, auth, headers) lives behind the [`Transport`] trait.

use crate::config::TransportConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

/// Byte chunks of a turn response.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Errors opening or reading the response stream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },

    /// HTTP-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid transport configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Get the HTTP status, if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Config(_) => None,
        }
    }
}

/// The body sent to start a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    /// JSON request body.
    pub body: JsonValue,
}

impl TurnRequest {
    /// Create a request with the given JSON body.
    #[must_use]
    pub fn new(body: JsonValue) -> Self {
        Self { body }
    }
}

/// Opens the response byte stream for a turn.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue the request and return the response body as byte chunks.
    ///
    /// A non-success response is an error; the body is not streamed.
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError>;
}

/// [`Transport`] that POSTs JSON over HTTP and reads an SSE response.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Create a transport with a fresh client.
    ///
    /// No whole-request timeout is set: a turn streams for as long as the
    /// server keeps it open, bounded only by the configured idle timeout.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.read_timeout {
            builder = builder.read_timeout(timeout);
        }
        let client = builder.build()?;
        Self::with_client(client, config)
    }

    /// Create with a custom reqwest client.
    ///
    /// The client's own timeouts apply; `connect_timeout` and `read_timeout`
    /// from the config are ignored.
    pub fn with_client(client: Client, config: TransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Config(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Config(format!("invalid value for header {name}: {e}")))?;
            headers.insert(name, value);
        }

        Ok(Self {
            client,
            config,
            headers,
        })
    }

    /// Get the transport config.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &TurnRequest) -> Result<ByteStream, TransportError> {
        debug!(endpoint = %self.config.endpoint, "Opening turn stream");

        let mut req = self
            .client
            .post(self.config.endpoint.clone())
            .headers(self.headers.clone())
            .json(&request.body);
        if let Some(token) = &self.config.bearer_token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Turn request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes_stream().map_err(TransportError::from).boxed())
    }
}
