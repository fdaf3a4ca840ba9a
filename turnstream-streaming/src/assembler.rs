//! Per-chunk reconstruction pipeline.
//!
//! [`TurnAssembler`] runs one byte chunk through decode, framing, event
//! decoding and dispatch, returning the snapshots that chunk produced. It
//! has no I/O of its own; [`TurnSession`](crate::TurnSession) drives it
//! from a byte stream.

use crate::config::StreamConfig;
use crate::decoder::Utf8Decoder;
use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::StreamError;
use crate::events::TurnEvent;
use crate::side_effects::SideEffectSink;
use crate::sse::{FrameSplitter, SseFrame};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use turnstream_core::{Accumulator, RunStatus, Snapshot, REASON_STREAM_ENDED};

/// Characters of a malformed payload included in the log line.
const LOG_PREVIEW_CHARS: usize = 256;

/// Bytes → frames → events → snapshots, one chunk at a time.
#[derive(Debug)]
pub struct TurnAssembler {
    decoder: Utf8Decoder,
    splitter: FrameSplitter,
    dispatcher: Dispatcher,
    accumulator: Accumulator,
    synthesize_stream_end: bool,
}

impl TurnAssembler {
    /// Create an assembler with an empty accumulator.
    pub fn new(config: &StreamConfig, sink: Arc<dyn SideEffectSink>) -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            splitter: FrameSplitter::with_max_frame_bytes(config.max_buffer_bytes),
            dispatcher: Dispatcher::new(config, sink),
            accumulator: Accumulator::new(),
            synthesize_stream_end: config.synthesize_stream_end,
        }
    }

    /// Use a caller-provided accumulator.
    #[must_use]
    pub fn with_accumulator(mut self, accumulator: Accumulator) -> Self {
        self.accumulator = accumulator;
        self
    }

    /// Get the accumulator.
    #[must_use]
    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Take a snapshot of the current state without an activity.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.accumulator.snapshot(None)
    }

    /// Check whether the run has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.accumulator.is_terminal()
    }

    /// Process one chunk of bytes.
    ///
    /// Returns the snapshots produced, in event order. Once the run is
    /// terminal, input is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Snapshot> {
        let mut out = Vec::new();
        if self.is_terminal() {
            return out;
        }

        let text = self.decoder.decode(chunk);
        let frames = self.splitter.feed_str(&text);
        trace!(bytes = chunk.len(), frames = frames.len(), "Processing chunk");

        for frame in frames {
            if self.is_terminal() {
                break;
            }
            self.process_frame(frame, &mut out);
        }

        self.check_overflow(&mut out);
        out
    }

    /// Process end of stream.
    ///
    /// Flushes the decoder and any unterminated final frame. If the run is
    /// still going afterwards and `synthesize_stream_end` is set, it ends
    /// as `Incomplete("stream_ended")`.
    pub fn finish(&mut self) -> Vec<Snapshot> {
        let mut out = Vec::new();
        if self.is_terminal() {
            return out;
        }

        let tail = self.decoder.finish();
        let mut frames = self.splitter.feed_str(&tail);
        frames.extend(self.splitter.finish());

        for frame in frames {
            if self.is_terminal() {
                break;
            }
            self.process_frame(frame, &mut out);
        }
        self.check_overflow(&mut out);

        if !self.is_terminal() && self.synthesize_stream_end {
            debug!("Stream ended without a terminal event");
            if self
                .accumulator
                .finish(RunStatus::incomplete(REASON_STREAM_ENDED))
                .is_ok()
            {
                out.push(self.accumulator.snapshot(None));
            }
        }

        out
    }

    /// End the run because of an error outside the event stream.
    pub fn fail(&mut self, err: &StreamError) -> Vec<Snapshot> {
        let mut out = Vec::new();
        self.push_failure(err, &mut out);
        out
    }

    /// Consume the assembler, returning the accumulator.
    #[must_use]
    pub fn into_accumulator(self) -> Accumulator {
        self.accumulator
    }

    fn process_frame(&mut self, frame: SseFrame, out: &mut Vec<Snapshot>) {
        match TurnEvent::decode(&frame.data) {
            Ok(event) => {
                if let Dispatch::Emit(activity) = self.dispatcher.dispatch(&mut self.accumulator, event)
                {
                    out.push(self.accumulator.snapshot(activity));
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    data = %preview(&frame.data),
                    "Malformed frame; ending run"
                );
                self.push_failure(&err, out);
            }
        }
    }

    fn check_overflow(&mut self, out: &mut Vec<Snapshot>) {
        if self.is_terminal() || !self.splitter.overflowed() {
            return;
        }
        let err = StreamError::BufferOverflow {
            limit: self.splitter.max_frame_bytes(),
        };
        warn!(error = %err, "Frame too large; ending run");
        self.push_failure(&err, out);
    }

    fn push_failure(&mut self, err: &StreamError, out: &mut Vec<Snapshot>) {
        let message = err.user_message();
        if self
            .dispatcher
            .fail(&mut self.accumulator, &message)
            .should_emit()
        {
            out.push(self.accumulator.snapshot(None));
        }
    }
}

/// Cut a payload down for logging.
fn preview(data: &str) -> &str {
    match data.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((idx, _)) => &data[..idx],
        None => data,
    }
}
