//! The mutable message under construction.
//!
//! [`Accumulator`] owns the ordered content parts and the run status for one
//! stream session. It enforces the message invariants:
//!
//! - parts keep insertion order and are never removed or reordered
//! - at most one [`ToolCallRecord`] exists per tool call ID
//! - once the status is terminal, nothing changes any more
//!
//! Callers only ever see copies of it through [`Snapshot`].

use crate::errors::{CoreError, Result};
use crate::identifier::ToolCallId;
use crate::messages::{Activity, ContentPart, RunStatus, Snapshot, TextSegment, ToolCallRecord};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Format an error message as user-visible text.
#[must_use]
pub fn error_annotation(message: &str) -> String {
    format!("Error: {}", message)
}

/// Ordered content parts plus run status for one session.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    parts: Vec<ContentPart>,
    status: RunStatus,
    /// Map from tool call ID to part index.
    tool_index: HashMap<ToolCallId, usize>,
}

impl Accumulator {
    /// Create an empty accumulator in the `Running` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator seeded with existing parts.
    ///
    /// Tool call records are indexed; if an ID repeats, the first record wins.
    #[must_use]
    pub fn from_parts(parts: Vec<ContentPart>) -> Self {
        let mut tool_index = HashMap::new();
        for (idx, part) in parts.iter().enumerate() {
            if let ContentPart::ToolCall(record) = part {
                tool_index.entry(record.tool_call_id.clone()).or_insert(idx);
            }
        }
        Self {
            parts,
            status: RunStatus::Running,
            tool_index,
        }
    }

    /// Get the parts.
    #[must_use]
    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Get the number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if there are no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Check whether the run has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Look up a tool call record by ID.
    #[must_use]
    pub fn tool_call(&self, id: &ToolCallId) -> Option<&ToolCallRecord> {
        let idx = *self.tool_index.get(id)?;
        self.parts.get(idx).and_then(ContentPart::as_tool_call)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(CoreError::Finished {
                status: self.status.label(),
            });
        }
        Ok(())
    }

    /// Append a text delta.
    ///
    /// Extends the last part when it is text, otherwise starts a new
    /// segment. An empty delta never creates a segment.
    pub fn append_text(&mut self, delta: &str) -> Result<()> {
        self.ensure_running()?;

        if let Some(ContentPart::Text(last)) = self.parts.last_mut() {
            last.push_str(delta);
        } else if !delta.is_empty() {
            self.parts.push(TextSegment::new(delta).into());
        }
        Ok(())
    }

    /// Append a new tool call record.
    pub fn start_tool_call(&mut self, record: ToolCallRecord) -> Result<()> {
        self.ensure_running()?;

        if self.tool_index.contains_key(&record.tool_call_id) {
            return Err(CoreError::DuplicateToolCall(record.tool_call_id));
        }

        self.tool_index
            .insert(record.tool_call_id.clone(), self.parts.len());
        self.parts.push(record.into());
        Ok(())
    }

    /// Record a tool result.
    ///
    /// Returns the updated record, or `None` when no call with this ID was
    /// started (nothing is changed in that case).
    pub fn complete_tool_call(
        &mut self,
        id: &ToolCallId,
        result: JsonValue,
    ) -> Result<Option<&ToolCallRecord>> {
        self.ensure_running()?;

        let Some(&idx) = self.tool_index.get(id) else {
            return Ok(None);
        };

        match self.parts.get_mut(idx) {
            Some(ContentPart::ToolCall(record)) => {
                record.complete(result);
                Ok(Some(&*record))
            }
            _ => Ok(None),
        }
    }

    /// Append an error annotation and end the run as incomplete.
    pub fn fail(&mut self, message: &str) -> Result<()> {
        self.ensure_running()?;
        self.parts
            .push(TextSegment::new(error_annotation(message)).into());
        self.status = RunStatus::error();
        Ok(())
    }

    /// Move to a terminal status.
    pub fn finish(&mut self, status: RunStatus) -> Result<()> {
        if self.status.is_terminal() || !status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status.label(),
                to: status.label(),
            });
        }
        self.status = status;
        Ok(())
    }

    /// Take a read-only copy, optionally annotated with an activity.
    #[must_use]
    pub fn snapshot(&self, activity: Option<Activity>) -> Snapshot {
        Snapshot::new(self.parts.clone(), self.status.clone()).with_activity(activity)
    }

    /// Consume the accumulator, returning its parts and status.
    #[must_use]
    pub fn into_inner(self) -> (Vec<ContentPart>, RunStatus) {
        (self.parts, self.status)
    }
}
