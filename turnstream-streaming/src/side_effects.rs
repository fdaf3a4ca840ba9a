//! Outbound notifications for UI collaborators.
//!
//! Some tools produce artifacts another part of the application wants to
//! know about (a created file, a live browser session). The dispatcher
//! reports those through an injected [`SideEffectSink`]; it never waits for
//! a reply.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use tokio::sync::mpsc;

/// A notification produced by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SideEffect {
    /// A file was created.
    FileCreated {
        /// Tool that produced it.
        tool: String,
        /// Tool payload.
        result: JsonValue,
    },
    /// A file was downloaded.
    FileDownloaded {
        /// Tool that produced it.
        tool: String,
        /// Tool payload.
        result: JsonValue,
    },
    /// A browser session can be viewed.
    #[serde(rename_all = "camelCase")]
    BrowserSession {
        /// URL of the live viewer.
        viewer_url: String,
        /// Session identifier, if reported.
        session_id: Option<String>,
        /// Display title.
        title: String,
    },
}

/// Receiver of side-effect notifications.
///
/// Implementations must not block.
pub trait SideEffectSink: Send + Sync {
    /// Deliver a notification.
    fn notify(&self, effect: SideEffect);
}

impl<F> SideEffectSink for F
where
    F: Fn(SideEffect) + Send + Sync,
{
    fn notify(&self, effect: SideEffect) {
        self(effect)
    }
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl SideEffectSink for NoopSink {
    fn notify(&self, _effect: SideEffect) {}
}

/// Sink that forwards notifications over an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SideEffect>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SideEffect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl fmt::Debug for ChannelSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl SideEffectSink for ChannelSink {
    fn notify(&self, effect: SideEffect) {
        if self.tx.send(effect).is_err() {
            tracing::debug!("Side-effect receiver dropped; notification discarded");
        }
    }
}

/// Which tool names trigger which notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEffectRules {
    /// Tools whose result is a created file.
    pub file_tools: Vec<String>,
    /// Tools whose result is a downloaded file.
    pub download_tools: Vec<String>,
    /// Tools whose result may describe a browser session.
    pub browser_tools: Vec<String>,
    /// Any tool whose name contains this fragment is also a browser tool.
    pub browser_name_fragment: Option<String>,
}

impl Default for SideEffectRules {
    fn default() -> Self {
        Self {
            file_tools: vec!["create_file".into()],
            download_tools: vec!["download_from_url".into()],
            browser_tools: vec!["stagehand_goto".into()],
            browser_name_fragment: Some("browser_session".into()),
        }
    }
}

/// Keys that may hold a browser viewer URL, in priority order.
const VIEWER_URL_KEYS: &[&str] = &["viewerUrl", "liveViewUrl", "debuggerFullscreenUrl", "debugUrl"];

impl SideEffectRules {
    /// Rules that never match.
    #[must_use]
    pub fn none() -> Self {
        Self {
            file_tools: Vec::new(),
            download_tools: Vec::new(),
            browser_tools: Vec::new(),
            browser_name_fragment: None,
        }
    }

    /// Check whether a tool is covered by any rule.
    #[must_use]
    pub fn watches(&self, tool: &str) -> bool {
        [&self.file_tools, &self.download_tools]
            .iter()
            .any(|list| list.iter().any(|t| t == tool))
            || self.is_browser_tool(tool)
    }

    fn is_browser_tool(&self, tool: &str) -> bool {
        self.browser_tools.iter().any(|t| t == tool)
            || self
                .browser_name_fragment
                .as_deref()
                .is_some_and(|fragment| !fragment.is_empty() && tool.contains(fragment))
    }

    /// Match a tool payload against the rules.
    ///
    /// The payload is decoded as JSON first when it is a JSON-encoded string.
    #[must_use]
    pub fn detect(&self, tool: &str, payload: &JsonValue) -> Option<SideEffect> {
        if !self.watches(tool) {
            return None;
        }

        let payload = decode_embedded_json(payload);

        if self.file_tools.iter().any(|t| t == tool) {
            return Some(SideEffect::FileCreated {
                tool: tool.to_string(),
                result: payload,
            });
        }

        if self.download_tools.iter().any(|t| t == tool) {
            return Some(SideEffect::FileDownloaded {
                tool: tool.to_string(),
                result: payload,
            });
        }

        let obj = payload.as_object()?;
        let viewer_url = VIEWER_URL_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(JsonValue::as_str))?;
        let session_id = ["sessionId", "session_id", "id"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(JsonValue::as_str))
            .map(str::to_string);
        let title = obj
            .get("title")
            .and_then(JsonValue::as_str)
            .unwrap_or("Browser session")
            .to_string();

        Some(SideEffect::BrowserSession {
            viewer_url: viewer_url.to_string(),
            session_id,
            title,
        })
    }
}

/// Decode a string holding JSON; anything else is returned unchanged.
fn decode_embedded_json(payload: &JsonValue) -> JsonValue {
    match payload {
        JsonValue::String(s) => {
            let trimmed = s.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                serde_json::from_str(s).unwrap_or_else(|_| payload.clone())
            } else {
                payload.clone()
            }
        }
        other => other.clone(),
    }
}
