//! Content part types for a reconstructed assistant message.
//!
//! A message body is an ordered list of [`ContentPart`]s: growing text
//! segments and tool invocation records.

use crate::identifier::ToolCallId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A run of assistant text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    /// The text content.
    pub text: String,
}

impl TextSegment {
    /// Part kind identifier.
    pub const PART_KIND: &'static str = "text";

    /// Create a new text segment.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Append a delta to the end of the segment.
    pub fn push_str(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    /// Check if the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Get the text length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }
}

impl From<String> for TextSegment {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TextSegment {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Lifecycle of a tool call record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Started, no result yet.
    #[default]
    Pending,
    /// A result has been received.
    Completed,
}

/// A tool invocation and, once available, its result.
///
/// Names, arguments and results are opaque payloads; nothing here
/// interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    /// Identifier correlating the start with its later result.
    pub tool_call_id: ToolCallId,
    /// Name of the tool that was called.
    pub tool_name: String,
    /// Arguments as sent by the server.
    #[serde(default)]
    pub arguments: JsonValue,
    /// Current status.
    #[serde(default)]
    pub status: ToolCallStatus,
    /// The result, present once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
}

impl ToolCallRecord {
    /// Part kind identifier.
    pub const PART_KIND: &'static str = "tool-call";

    /// Create a new pending record.
    #[must_use]
    pub fn new(tool_call_id: impl Into<ToolCallId>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            arguments: JsonValue::Null,
            status: ToolCallStatus::Pending,
            result: None,
        }
    }

    /// Set the arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: JsonValue) -> Self {
        self.arguments = arguments;
        self
    }

    /// Mark completed with the given result.
    ///
    /// Completing twice overwrites the earlier result.
    pub fn complete(&mut self, result: JsonValue) {
        self.status = ToolCallStatus::Completed;
        self.result = Some(result);
    }

    /// Check whether a result has been received.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ToolCallStatus::Completed
    }
}

/// One element of a reconstructed message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    /// Assistant text.
    Text(TextSegment),
    /// A tool invocation.
    ToolCall(ToolCallRecord),
}

impl ContentPart {
    /// Get the part kind identifier.
    #[must_use]
    pub fn part_kind(&self) -> &'static str {
        match self {
            Self::Text(_) => TextSegment::PART_KIND,
            Self::ToolCall(_) => ToolCallRecord::PART_KIND,
        }
    }

    /// Check if this is a text part.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Check if this is a tool call.
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall(_))
    }

    /// Get the text if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            Self::ToolCall(_) => None,
        }
    }

    /// Get the tool call record if this is a tool call.
    #[must_use]
    pub fn as_tool_call(&self) -> Option<&ToolCallRecord> {
        match self {
            Self::ToolCall(r) => Some(r),
            Self::Text(_) => None,
        }
    }
}

impl From<TextSegment> for ContentPart {
    fn from(segment: TextSegment) -> Self {
        Self::Text(segment)
    }
}

impl From<ToolCallRecord> for ContentPart {
    fn from(record: ToolCallRecord) -> Self {
        Self::ToolCall(record)
    }
}
