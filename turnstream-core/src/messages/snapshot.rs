//! Immutable views of a message under construction.

use super::parts::{ContentPart, ToolCallRecord};
use super::status::{Activity, RunStatus};
use serde::{Deserialize, Serialize};

/// A read-only copy of the accumulated message at one point in the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Content parts in arrival order.
    pub parts: Vec<ContentPart>,
    /// Run status at the time of the snapshot.
    pub status: RunStatus,
    /// Ephemeral hint for this snapshot only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
}

impl Snapshot {
    /// Create a snapshot.
    #[must_use]
    pub fn new(parts: Vec<ContentPart>, status: RunStatus) -> Self {
        Self {
            parts,
            status,
            activity: None,
        }
    }

    /// Attach an activity.
    #[must_use]
    pub fn with_activity(mut self, activity: Option<Activity>) -> Self {
        self.activity = activity;
        self
    }

    /// The empty "started" snapshot shown before any bytes arrive.
    #[must_use]
    pub fn started() -> Self {
        Self::default()
    }

    /// Check whether the snapshot carries a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Concatenate all text segments.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(ContentPart::as_text).collect()
    }

    /// Iterate over tool call records.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.parts.iter().filter_map(ContentPart::as_tool_call)
    }
}
