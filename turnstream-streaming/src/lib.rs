//! # turnstream-streaming
//!
//! Reconstructs a server-pushed agent turn into a continuously updated
//! message.
//!
//! Data flows one way: bytes → decoded text → frames → events →
//! accumulator mutation → snapshot.
//!
//! ## Core Concepts
//!
//! - **[`TurnSession`]**: pull-based stream of [`Snapshot`]s for one turn
//! - **[`TurnAssembler`]**: the synchronous per-chunk pipeline
//! - **[`Utf8Decoder`]**: stateful UTF-8 decoding across chunk boundaries
//! - **[`FrameSplitter`]**: blank-line framing of `data:` payloads
//! - **[`TurnEvent`]**: decoded wire events
//! - **[`Dispatcher`]**: per-event state transitions
//! - **[`SideEffectSink`]**: injected receiver for tool notifications
//!
//! ## Example
//!
//! ```ignore
//! use turnstream_streaming::TurnSession;
//! use tokio_util::sync::CancellationToken;
//! use futures::StreamExt;
//!
//! let cancel = CancellationToken::new();
//! let mut session = Box::pin(TurnSession::new(byte_stream, cancel.clone()));
//!
//! while let Some(snapshot) = session.next().await {
//!     render(&snapshot.parts, &snapshot.status, snapshot.activity.as_ref());
//! }
//! ```
//!
//! [`Snapshot`]: turnstream_core::Snapshot

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod assembler;
pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod session;
pub mod side_effects;
pub mod sse;

// Re-exports
pub use assembler::TurnAssembler;
pub use config::{StreamConfig, DEFAULT_MAX_BUFFER_BYTES};
pub use decoder::Utf8Decoder;
pub use dispatch::{run_status_from_wire, Dispatch, Dispatcher};
pub use error::{StreamError, StreamResult};
pub use events::{ToolCallStart, ToolResult, TurnEvent};
pub use session::{SessionState, TurnSession};
pub use side_effects::{ChannelSink, NoopSink, SideEffect, SideEffectRules, SideEffectSink};
pub use sse::{FrameSplitter, SseFrame};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ChannelSink, NoopSink, SessionState, SideEffect, SideEffectRules, SideEffectSink,
        StreamConfig, StreamError, StreamResult, TurnAssembler, TurnEvent, TurnSession,
    };
}
