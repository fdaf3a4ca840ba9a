//! Message types for a reconstructed agent turn.
//!
//! - [`parts`]: text segments and tool call records
//! - [`status`]: run status and ephemeral activity hints
//! - [`snapshot`]: read-only views handed to callers

pub mod parts;
pub mod snapshot;
pub mod status;

pub use parts::{ContentPart, TextSegment, ToolCallRecord, ToolCallStatus};
pub use snapshot::Snapshot;
pub use status::{Activity, RunStatus, REASON_ERROR, REASON_STREAM_ENDED};
