//! # turnstream-core
//!
//! Core types for reconstructing a streamed agent turn into a single
//! structured message.
//!
//! - **Messages**: text segments, tool call records, run status, snapshots
//! - **Accumulator**: the ordered, mutable message owned by one session
//! - **Errors**: invariant violations raised by the accumulator
//! - **Identifiers**: session and tool call IDs
//!
//! ## Example
//!
//! ```rust
//! use turnstream_core::{Accumulator, RunStatus, ToolCallRecord};
//! use serde_json::json;
//!
//! let mut acc = Accumulator::new();
//! acc.start_tool_call(ToolCallRecord::new("1", "search")).unwrap();
//! acc.append_text("Hi").unwrap();
//! acc.complete_tool_call(&"1".into(), json!("42")).unwrap();
//! acc.finish(RunStatus::complete(json!({"type": "complete"}))).unwrap();
//!
//! let snapshot = acc.snapshot(None);
//! assert_eq!(snapshot.text(), "Hi");
//! assert!(snapshot.is_terminal());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod accumulator;
pub mod errors;
pub mod identifier;
pub mod messages;

pub use accumulator::{error_annotation, Accumulator};
pub use errors::{CoreError, Result};
pub use identifier::{SessionId, ToolCallId};
pub use messages::{
    Activity, ContentPart, RunStatus, Snapshot, TextSegment, ToolCallRecord, ToolCallStatus,
    REASON_ERROR, REASON_STREAM_ENDED,
};
