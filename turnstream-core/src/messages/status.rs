//! Run status and ephemeral activity annotations.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Reason recorded when a run ends because of an error.
pub const REASON_ERROR: &str = "error";

/// Reason recorded when the byte stream ends without a terminal event.
pub const REASON_STREAM_ENDED: &str = "stream_ended";

/// Status of a streamed run.
///
/// `Running` is the only non-terminal state. Transitions only move
/// forward: once `Incomplete` or `Complete` is reached it never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunStatus {
    /// Content is still arriving.
    #[default]
    Running,
    /// The run stopped early.
    Incomplete {
        /// Why the run stopped (e.g. `error`, `stream_ended`).
        reason: String,
    },
    /// The run finished normally.
    Complete {
        /// Final status payload as sent by the server.
        payload: JsonValue,
    },
}

impl RunStatus {
    /// Create an incomplete status.
    #[must_use]
    pub fn incomplete(reason: impl Into<String>) -> Self {
        Self::Incomplete {
            reason: reason.into(),
        }
    }

    /// Create an incomplete status caused by an error.
    #[must_use]
    pub fn error() -> Self {
        Self::incomplete(REASON_ERROR)
    }

    /// Create a complete status.
    #[must_use]
    pub fn complete(payload: JsonValue) -> Self {
        Self::Complete { payload }
    }

    /// Check whether this status ends the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Check whether the run is still in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check whether the run ended because of an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Incomplete { reason } if reason == REASON_ERROR)
    }

    /// Get the incomplete reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Incomplete { reason } => Some(reason),
            _ => None,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Incomplete { .. } => "incomplete",
            Self::Complete { .. } => "complete",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete { reason } => write!(f, "incomplete ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// A momentary hint attached to a single snapshot.
///
/// Activities are never stored in the message content; the next snapshot
/// carries its own activity, or none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Activity {
    /// The agent is thinking.
    Thinking {
        /// Status message.
        message: String,
    },
    /// Step progress through a multi-step run.
    Step {
        /// Current step.
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<u32>,
        /// Total number of steps.
        #[serde(rename = "totalSteps", skip_serializing_if = "Option::is_none")]
        total_steps: Option<u32>,
        /// Fraction in `0.0..=1.0`, present when both step and total are.
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        /// Optional message.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A tool reported intermediate status.
    ToolStatus {
        /// Tool name.
        tool: String,
        /// Status message.
        message: String,
    },
    /// A tool reported completion.
    ToolCompletion {
        /// Tool name.
        tool: String,
        /// Completion message (string or structured).
        message: JsonValue,
    },
    /// Aggregate counters for the run.
    Summary {
        /// Number of tool executions.
        #[serde(rename = "toolExecutions", skip_serializing_if = "Option::is_none")]
        tool_executions: Option<u64>,
        /// Names of the tools used.
        #[serde(rename = "toolsUsed", default)]
        tools_used: Vec<String>,
    },
}

impl Activity {
    /// Create a thinking activity.
    #[must_use]
    pub fn thinking(message: impl Into<String>) -> Self {
        Self::Thinking {
            message: message.into(),
        }
    }

    /// Create a step activity, deriving the progress fraction.
    #[must_use]
    pub fn step(step: Option<u32>, total_steps: Option<u32>, message: Option<String>) -> Self {
        let progress = match (step, total_steps) {
            (Some(step), Some(total)) if total > 0 => {
                Some((f64::from(step) / f64::from(total)).clamp(0.0, 1.0))
            }
            _ => None,
        };
        Self::Step {
            step,
            total_steps,
            progress,
            message,
        }
    }

    /// Get the progress fraction, if known.
    #[must_use]
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Step { progress, .. } => *progress,
            _ => None,
        }
    }

    /// Get the message as display text, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Thinking { message } | Self::ToolStatus { message, .. } => Some(message.clone()),
            Self::Step { message, .. } => message.clone(),
            Self::ToolCompletion { message, .. } => Some(match message {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            }),
            Self::Summary { .. } => None,
        }
    }
}
