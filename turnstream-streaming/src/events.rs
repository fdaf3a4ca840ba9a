//! Wire event types.
//!
//! Each frame payload is a JSON object with a `type` discriminator. Known
//! types decode into [`TurnEvent`]; unknown types become
//! [`TurnEvent::Unknown`] so newer servers do not break older clients.
//!
//! Events that change the message (`tool-call-start`, `text-delta`,
//! `tool-result`) are decoded strictly. Status hints and the `error` event
//! are decoded leniently: a field of an unexpected type is converted or
//! dropped instead of failing the frame.

use crate::error::{StreamError, StreamResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use turnstream_core::ToolCallId;

/// Payload of a `tool-call-start` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallStart {
    /// Tool call ID.
    pub tool_call_id: ToolCallId,
    /// Tool name.
    pub tool_name: String,
    /// Arguments, opaque.
    #[serde(default, alias = "arguments")]
    pub args: JsonValue,
}

/// Payload of a `tool-result` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// Tool call ID this result belongs to.
    pub tool_call_id: ToolCallId,
    /// Tool name, when the server repeats it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Result, opaque.
    #[serde(default)]
    pub result: JsonValue,
}

/// Events received during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TurnEvent {
    /// A tool call started.
    ToolCallStart {
        /// The new call.
        part: ToolCallStart,
    },

    /// Text increment.
    TextDelta {
        /// The text to append.
        text: String,
    },

    /// The agent is thinking.
    Thinking {
        /// Status message.
        #[serde(default, deserialize_with = "lenient::string")]
        message: String,
    },

    /// Step progress.
    StepProgression {
        /// Current step.
        #[serde(default, deserialize_with = "lenient::step")]
        step: Option<u32>,
        /// Total steps.
        #[serde(default, rename = "totalSteps", deserialize_with = "lenient::step")]
        total_steps: Option<u32>,
        /// Optional message.
        #[serde(default, deserialize_with = "lenient::opt_string")]
        message: Option<String>,
    },

    /// Intermediate status from a tool.
    ToolStatus {
        /// Tool name.
        #[serde(default, deserialize_with = "lenient::string")]
        tool: String,
        /// Status message.
        #[serde(default, deserialize_with = "lenient::string")]
        message: String,
    },

    /// A tool reported completion.
    ToolCompletion {
        /// Tool name.
        #[serde(default, deserialize_with = "lenient::string")]
        tool: String,
        /// Message; may be plain text, a JSON-encoded string, or an object.
        #[serde(default)]
        message: JsonValue,
    },

    /// A tool result.
    ToolResult {
        /// The result.
        part: ToolResult,
    },

    /// Aggregate counters for the run.
    CompletionSummary {
        /// Number of tool executions.
        #[serde(default, rename = "toolExecutions", deserialize_with = "lenient::count")]
        tool_executions: Option<u64>,
        /// Tools used.
        #[serde(default, rename = "toolsUsed", deserialize_with = "lenient::names")]
        tools_used: Vec<String>,
    },

    /// Server-declared error; ends the run.
    Error {
        /// Error text; an object contributes its `message`.
        #[serde(default, deserialize_with = "lenient::error_text")]
        error: Option<String>,
        /// Alternate error text field.
        #[serde(default, deserialize_with = "lenient::error_text")]
        message: Option<String>,
    },

    /// End of message; ends the run.
    MessageEnd {
        /// Final status object.
        #[serde(default)]
        status: Option<JsonValue>,
    },

    /// A `type` this client does not know.
    #[serde(skip)]
    Unknown {
        /// The unrecognized type name.
        kind: String,
    },
}

impl TurnEvent {
    /// All `type` values this client understands.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "tool-call-start",
        "text-delta",
        "thinking",
        "step-progression",
        "tool-status",
        "tool-completion",
        "tool-result",
        "completion-summary",
        "error",
        "message-end",
    ];

    /// Decode a frame payload.
    ///
    /// Fails on invalid JSON, a non-object payload, a missing `type`, or a
    /// known type whose fields have the wrong shape.
    pub fn decode(data: &str) -> StreamResult<Self> {
        let value: JsonValue = serde_json::from_str(data)?;

        let kind = match value.get("type") {
            Some(JsonValue::String(kind)) => kind.clone(),
            Some(_) => return Err(StreamError::ParseEvent("`type` is not a string".into())),
            None if value.is_object() => {
                return Err(StreamError::ParseEvent("missing `type` field".into()))
            }
            None => return Err(StreamError::ParseEvent("payload is not an object".into())),
        };

        if !Self::KNOWN_TYPES.contains(&kind.as_str()) {
            return Ok(Self::Unknown { kind });
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Get the wire `type` of this event.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::ToolCallStart { .. } => "tool-call-start",
            Self::TextDelta { .. } => "text-delta",
            Self::Thinking { .. } => "thinking",
            Self::StepProgression { .. } => "step-progression",
            Self::ToolStatus { .. } => "tool-status",
            Self::ToolCompletion { .. } => "tool-completion",
            Self::ToolResult { .. } => "tool-result",
            Self::CompletionSummary { .. } => "completion-summary",
            Self::Error { .. } => "error",
            Self::MessageEnd { .. } => "message-end",
            Self::Unknown { kind } => kind,
        }
    }

    /// Check if this event ends the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::MessageEnd { .. })
    }

    /// Check if this event changes the message content.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(
            self,
            Self::ToolCallStart { .. } | Self::TextDelta { .. } | Self::ToolResult { .. }
        )
    }
}

/// Field decoders that never fail on a well-formed JSON value.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value as JsonValue;

    fn text(value: &JsonValue) -> Option<String> {
        match value {
            JsonValue::Null => None,
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn error_message(value: &JsonValue) -> Option<String> {
        match value {
            JsonValue::Object(map) => ["message", "error"]
                .iter()
                .find_map(|key| map.get(*key).and_then(error_message))
                .or_else(|| Some(value.to_string())),
            other => text(other),
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(&JsonValue::deserialize(d)?).unwrap_or_default())
    }

    pub(super) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(text(&JsonValue::deserialize(d)?))
    }

    pub(super) fn error_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(error_message(&JsonValue::deserialize(d)?))
    }

    pub(super) fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match JsonValue::deserialize(d)? {
            JsonValue::Number(n) => n.as_u64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub(super) fn step<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(count(d)?.and_then(|n| u32::try_from(n).ok()))
    }

    pub(super) fn names<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match JsonValue::deserialize(d)? {
            JsonValue::Array(items) => items.iter().filter_map(text).collect(),
            _ => Vec::new(),
        })
    }
}

impl fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}
