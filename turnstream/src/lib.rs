//! # turnstream - live agent turns as message snapshots
//!
//! turnstream consumes the server-sent event stream of an agent turn and
//! rebuilds it, incrementally, into one assistant message: ordered text
//! segments and tool-call records, a run status, and a transient activity
//! indicator. Every meaningful change yields a complete [`Snapshot`] that a
//! UI can render as-is.
//!
//! ## Quick Start
//!
//! ```ignore
//! use turnstream::prelude::*;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TurnClient::http(
//!         TransportConfig::new("https://agent.example.com/turn".parse()?)
//!             .bearer_token("secret"),
//!     )?;
//!
//!     let cancel = CancellationToken::new();
//!     let mut session = Box::pin(client.stream(
//!         TurnRequest::new(serde_json::json!({"prompt": "Plan my week"})),
//!         cancel.clone(),
//!     ));
//!
//!     while let Some(snapshot) = session.next().await {
//!         println!("{}: {}", snapshot.status, snapshot.text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`turnstream_core`] - message parts, run status, the accumulator
//! - [`turnstream_streaming`] - decoding, framing, dispatch, sessions
//! - this crate - the HTTP transport and [`TurnClient`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod transport;

pub use client::TurnClient;
pub use config::TransportConfig;
pub use transport::{ByteStream, HttpTransport, Transport, TransportError, TurnRequest};

/// Core types.
pub use turnstream_core as core;
/// Streaming engine.
pub use turnstream_streaming as streaming;

pub use turnstream_core::{
    Accumulator, Activity, ContentPart, RunStatus, SessionId, Snapshot, TextSegment,
    ToolCallId, ToolCallRecord, ToolCallStatus,
};
pub use turnstream_streaming::{
    SessionState, SideEffect, SideEffectRules, SideEffectSink, StreamConfig, StreamError,
    TurnSession,
};

/// Re-exported so callers can cancel sessions without a direct dependency.
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    // Messages
    pub use crate::core::{
        Activity, ContentPart, RunStatus, Snapshot, TextSegment, ToolCallRecord, ToolCallStatus,
    };

    // Streaming
    pub use crate::streaming::{
        ChannelSink, NoopSink, SessionState, SideEffect, SideEffectSink, StreamConfig,
        StreamError, TurnSession,
    };

    // Client
    pub use crate::{
        CancellationToken, HttpTransport, Transport, TransportConfig, TransportError,
        TurnClient, TurnRequest,
    };
}
