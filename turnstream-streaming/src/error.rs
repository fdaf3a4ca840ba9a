//! Streaming errors.

use thiserror::Error;

/// Errors that can occur while reconstructing a turn.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Frame payload is not valid JSON, or has the wrong shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame payload is JSON but not a usable event.
    #[error("Failed to parse event: {0}")]
    ParseEvent(String),

    /// A frame grew past the configured limit.
    #[error("Frame buffer exceeded {limit} bytes")]
    BufferOverflow {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The byte source failed.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl StreamError {
    /// Text shown to the user when this error ends a run.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Json(e) => format!("Malformed stream event: {}", e),
            Self::ParseEvent(msg) => format!("Malformed stream event: {}", msg),
            Self::Transport(msg) => msg.clone(),
            Self::BufferOverflow { .. } => self.to_string(),
        }
    }

    /// Create a transport error from any error.
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
