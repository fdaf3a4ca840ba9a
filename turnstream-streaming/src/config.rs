//! Session configuration.

use crate::side_effects::SideEffectRules;
use serde::{Deserialize, Serialize};

/// Default frame size limit (10 MiB).
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for a stream session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Largest frame, in bytes of decoded text, accepted before the
    /// session fails. Applies whether or not the frame is complete yet.
    pub max_buffer_bytes: usize,
    /// Close a stream that ends without a terminal event as
    /// `Incomplete("stream_ended")`.
    pub synthesize_stream_end: bool,
    /// Emit a snapshot for a tool result that matches no tool call.
    pub emit_on_orphan_result: bool,
    /// Tool names that trigger side-effect notifications.
    pub side_effects: SideEffectRules,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            synthesize_stream_end: true,
            emit_on_orphan_result: true,
            side_effects: SideEffectRules::default(),
        }
    }
}

impl StreamConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frame size limit.
    #[must_use]
    pub fn max_buffer_bytes(mut self, limit: usize) -> Self {
        self.max_buffer_bytes = limit;
        self
    }

    /// Set whether a missing terminal event is synthesized.
    #[must_use]
    pub fn synthesize_stream_end(mut self, enabled: bool) -> Self {
        self.synthesize_stream_end = enabled;
        self
    }

    /// Set whether orphan tool results emit a snapshot.
    #[must_use]
    pub fn emit_on_orphan_result(mut self, enabled: bool) -> Self {
        self.emit_on_orphan_result = enabled;
        self
    }

    /// Set the side-effect rules.
    #[must_use]
    pub fn side_effects(mut self, rules: SideEffectRules) -> Self {
        self.side_effects = rules;
        self
    }
}
