//! Client wiring a transport to a turn session.

use crate::config::TransportConfig;
use crate::transport::{ByteStream, HttpTransport, Transport, TransportError, TurnRequest};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use turnstream_streaming::{NoopSink, SideEffectSink, StreamConfig, TurnSession};

/// Starts turn sessions against a [`Transport`].
///
/// The request is issued when the session is first read past its started
/// snapshot, so a failure to establish the stream surfaces as an error
/// snapshot rather than a separate error path.
#[derive(Clone)]
pub struct TurnClient {
    transport: Arc<dyn Transport>,
    stream_config: StreamConfig,
    sink: Arc<dyn SideEffectSink>,
}

impl TurnClient {
    /// Create a client over any transport.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Create a client over a shared transport.
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            stream_config: StreamConfig::default(),
            sink: Arc::new(NoopSink),
        }
    }

    /// Create a client over HTTP.
    pub fn http(config: TransportConfig) -> Result<Self, TransportError> {
        Ok(Self::new(HttpTransport::new(config)?))
    }

    /// Set the stream configuration.
    #[must_use]
    pub fn with_stream_config(mut self, config: StreamConfig) -> Self {
        self.stream_config = config;
        self
    }

    /// Set the side-effect sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn SideEffectSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Get the stream configuration.
    pub fn stream_config(&self) -> &StreamConfig {
        &self.stream_config
    }

    /// Start a turn.
    pub fn stream(&self, request: TurnRequest, cancel: CancellationToken) -> TurnSession<ByteStream> {
        let transport = Arc::clone(&self.transport);
        let source = stream::once(async move { transport.open(&request).await })
            .try_flatten()
            .boxed();

        TurnSession::with_config(source, cancel, &self.stream_config, Arc::clone(&self.sink))
    }
}

impl std::fmt::Debug for TurnClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnClient")
            .field("stream_config", &self.stream_config)
            .finish_non_exhaustive()
    }
}
