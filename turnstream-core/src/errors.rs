//! Error types for turnstream-core.

use crate::identifier::ToolCallId;
use thiserror::Error;

/// Errors raised by the message accumulator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A terminal status was about to be replaced.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status label.
        from: &'static str,
        /// Requested status label.
        to: &'static str,
    },

    /// The run has already ended; no further content is accepted.
    #[error("Run already finished ({status})")]
    Finished {
        /// Terminal status label.
        status: &'static str,
    },

    /// A tool call with this ID was already started.
    #[error("Duplicate tool call id: {0}")]
    DuplicateToolCall(ToolCallId),
}

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
