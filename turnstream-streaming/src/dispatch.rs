//! Event dispatch: the per-event state transitions.
//!
//! Only `tool-call-start`, `text-delta` and `tool-result` change the message
//! content. Progress, thinking and tool status events produce an
//! [`Activity`] for the next snapshot and are otherwise forgotten.
//! `error` and `message-end` move the run to a terminal status, after which
//! every further event is ignored.

use crate::config::StreamConfig;
use crate::events::TurnEvent;
use crate::side_effects::{SideEffectRules, SideEffectSink};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use turnstream_core::{Accumulator, Activity, RunStatus, ToolCallRecord};

/// Reason used when `message-end` reports `incomplete` without one.
const DEFAULT_INCOMPLETE_REASON: &str = "other";

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Nothing to show the caller.
    Ignored,
    /// Emit a snapshot, optionally annotated.
    Emit(Option<Activity>),
}

impl Dispatch {
    /// Check whether a snapshot should be emitted.
    #[must_use]
    pub fn should_emit(&self) -> bool {
        matches!(self, Self::Emit(_))
    }
}

/// Applies decoded events to an [`Accumulator`].
#[derive(Clone)]
pub struct Dispatcher {
    rules: SideEffectRules,
    sink: Arc<dyn SideEffectSink>,
    emit_on_orphan_result: bool,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rules", &self.rules)
            .field("emit_on_orphan_result", &self.emit_on_orphan_result)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher reporting side effects to `sink`.
    pub fn new(config: &StreamConfig, sink: Arc<dyn SideEffectSink>) -> Self {
        Self {
            rules: config.side_effects.clone(),
            sink,
            emit_on_orphan_result: config.emit_on_orphan_result,
        }
    }

    /// Apply one event.
    pub fn dispatch(&self, acc: &mut Accumulator, event: TurnEvent) -> Dispatch {
        if acc.is_terminal() {
            trace!(event = %event, "Run finished; ignoring event");
            return Dispatch::Ignored;
        }

        trace!(event = %event, "Dispatching event");

        match event {
            TurnEvent::ToolCallStart { part } => {
                let record =
                    ToolCallRecord::new(part.tool_call_id, part.tool_name).with_arguments(part.args);
                if let Err(e) = acc.start_tool_call(record) {
                    warn!(error = %e, "Ignoring tool-call-start");
                }
                Dispatch::Emit(None)
            }

            TurnEvent::TextDelta { text } => {
                if let Err(e) = acc.append_text(&text) {
                    warn!(error = %e, "Ignoring text-delta");
                }
                Dispatch::Emit(None)
            }

            TurnEvent::Thinking { message } => Dispatch::Emit(Some(Activity::thinking(message))),

            TurnEvent::StepProgression {
                step,
                total_steps,
                message,
            } => Dispatch::Emit(Some(Activity::step(step, total_steps, message))),

            TurnEvent::ToolStatus { tool, message } => {
                Dispatch::Emit(Some(Activity::ToolStatus { tool, message }))
            }

            TurnEvent::ToolCompletion { tool, message } => {
                self.notify(&tool, &message);
                Dispatch::Emit(Some(Activity::ToolCompletion { tool, message }))
            }

            TurnEvent::ToolResult { part } => {
                let matched = match acc.complete_tool_call(&part.tool_call_id, part.result.clone()) {
                    Ok(Some(record)) => Some(record.tool_name.clone()),
                    Ok(None) => {
                        warn!(
                            tool_call_id = %part.tool_call_id,
                            "Tool result for unknown tool call; ignoring"
                        );
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "Ignoring tool-result");
                        None
                    }
                };

                if let Some(tool) = matched.as_deref().or(part.tool_name.as_deref()) {
                    self.notify(tool, &part.result);
                }

                if matched.is_some() || self.emit_on_orphan_result {
                    Dispatch::Emit(None)
                } else {
                    Dispatch::Ignored
                }
            }

            TurnEvent::CompletionSummary {
                tool_executions,
                tools_used,
            } => Dispatch::Emit(Some(Activity::Summary {
                tool_executions,
                tools_used,
            })),

            TurnEvent::Error { error, message } => {
                let text = error
                    .or(message)
                    .unwrap_or_else(|| "Unknown error".to_string());
                debug!(error = %text, "Server reported error; ending run");
                self.fail(acc, &text)
            }

            TurnEvent::MessageEnd { status } => {
                let status = run_status_from_wire(status);
                debug!(status = %status, "Message end");
                if let Err(e) = acc.finish(status) {
                    warn!(error = %e, "Ignoring message-end");
                }
                Dispatch::Emit(None)
            }

            TurnEvent::Unknown { kind } => {
                debug!(kind = %kind, "Ignoring unknown event type");
                Dispatch::Ignored
            }
        }
    }

    /// End the run with an error annotation.
    ///
    /// Used for server `error` events and for fatal session faults
    /// (malformed frames, transport failures).
    pub fn fail(&self, acc: &mut Accumulator, message: &str) -> Dispatch {
        match acc.fail(message) {
            Ok(()) => Dispatch::Emit(None),
            Err(e) => {
                trace!(error = %e, "Run already finished; error not recorded");
                Dispatch::Ignored
            }
        }
    }

    fn notify(&self, tool: &str, payload: &JsonValue) {
        if let Some(effect) = self.rules.detect(tool, payload) {
            debug!(tool = %tool, "Emitting side effect");
            self.sink.notify(effect);
        }
    }
}

/// Map a `message-end` status object to a terminal [`RunStatus`].
///
/// `{"type": "incomplete", "reason": r}` becomes `Incomplete(r)`; any other
/// status is `Complete` carrying the raw payload.
#[must_use]
pub fn run_status_from_wire(status: Option<JsonValue>) -> RunStatus {
    let Some(status) = status else {
        return RunStatus::complete(json!({ "type": "complete" }));
    };

    let kind = match &status {
        JsonValue::String(s) => Some(s.as_str()),
        other => other.get("type").and_then(JsonValue::as_str),
    };

    if kind == Some("incomplete") {
        let reason = status
            .get("reason")
            .and_then(JsonValue::as_str)
            .unwrap_or(DEFAULT_INCOMPLETE_REASON);
        RunStatus::incomplete(reason)
    } else {
        RunStatus::complete(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side_effects::{NoopSink, SideEffect};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use turnstream_core::{ContentPart, TextSegment, ToolCallStatus};

    fn decode(s: &str) -> TurnEvent {
        TurnEvent::decode(s).unwrap()
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(&StreamConfig::default(), Arc::new(NoopSink))
    }

    #[test]
    fn test_text_deltas_concatenate() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        for text in ["Hel", "lo ", "world"] {
            let out = d.dispatch(&mut acc, TurnEvent::TextDelta { text: text.into() });
            assert_eq!(out, Dispatch::Emit(None));
        }
        assert_eq!(acc.parts(), &[ContentPart::from(TextSegment::new("Hello world"))]);
    }

    #[test]
    fn test_thinking_is_ephemeral() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        d.dispatch(&mut acc, decode(r#"{"type":"text-delta","text":"a"}"#));
        let out = d.dispatch(&mut acc, decode(r#"{"type":"thinking","message":"hmm"}"#));
        d.dispatch(&mut acc, decode(r#"{"type":"text-delta","text":"b"}"#));

        assert_eq!(out, Dispatch::Emit(Some(Activity::thinking("hmm"))));
        assert_eq!(acc.parts(), &[ContentPart::from(TextSegment::new("ab"))]);
    }

    #[test]
    fn test_status_events_do_not_mutate() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        let events = [
            r#"{"type":"step-progression","step":1,"totalSteps":2}"#,
            r#"{"type":"tool-status","tool":"search","message":"running"}"#,
            r#"{"type":"completion-summary","toolExecutions":3,"toolsUsed":["a"]}"#,
        ];
        for e in events {
            let out = d.dispatch(&mut acc, decode(e));
            assert!(matches!(out, Dispatch::Emit(Some(_))));
        }
        assert!(acc.is_empty());
        assert!(acc.status().is_running());
    }

    #[test]
    fn test_step_progress_fraction() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        let out = d.dispatch(
            &mut acc,
            decode(r#"{"type":"step-progression","step":1,"totalSteps":4}"#),
        );
        match out {
            Dispatch::Emit(Some(activity)) => assert_eq!(activity.progress(), Some(0.25)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_tool_call_and_result() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-call-start","part":{"toolCallId":"abc","toolName":"search"}}"#),
        );
        let out = d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-result","part":{"toolCallId":"abc","result":{"n":1}}}"#),
        );

        assert_eq!(out, Dispatch::Emit(None));
        assert_eq!(acc.len(), 1);
        let record = acc.parts()[0].as_tool_call().unwrap();
        assert_eq!(record.status, ToolCallStatus::Completed);
        assert_eq!(record.result, Some(json!({"n": 1})));
    }

    #[test]
    fn test_orphan_result() {
        let mut acc = Accumulator::new();
        let orphan = r#"{"type":"tool-result","part":{"toolCallId":"nope","result":1}}"#;

        let out = dispatcher().dispatch(&mut acc, decode(orphan));
        assert_eq!(out, Dispatch::Emit(None));
        assert!(acc.is_empty());

        let quiet = Dispatcher::new(
            &StreamConfig::default().emit_on_orphan_result(false),
            Arc::new(NoopSink),
        );
        assert_eq!(quiet.dispatch(&mut acc, decode(orphan)), Dispatch::Ignored);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_repeated_result_overwrites() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-call-start","part":{"toolCallId":"1","toolName":"t"}}"#),
        );
        d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-result","part":{"toolCallId":"1","result":"a"}}"#),
        );
        d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-result","part":{"toolCallId":"1","result":"b"}}"#),
        );
        let record = acc.parts()[0].as_tool_call().unwrap();
        assert!(record.is_completed());
        assert_eq!(record.result, Some(json!("b")));
    }

    #[test]
    fn test_error_event_is_terminal() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        d.dispatch(&mut acc, decode(r#"{"type":"text-delta","text":"hi"}"#));
        let out = d.dispatch(&mut acc, decode(r#"{"type":"error","error":"quota"}"#));

        assert_eq!(out, Dispatch::Emit(None));
        assert!(acc.status().is_error());
        assert_eq!(acc.parts()[1].as_text(), Some("Error: quota"));

        let after = d.dispatch(&mut acc, decode(r#"{"type":"text-delta","text":"late"}"#));
        assert_eq!(after, Dispatch::Ignored);
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_error_object_message_is_annotated() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        let out = d.dispatch(
            &mut acc,
            decode(r#"{"type":"error","error":{"message":"quota exceeded"}}"#),
        );

        assert_eq!(out, Dispatch::Emit(None));
        assert_eq!(acc.parts()[0].as_text(), Some("Error: quota exceeded"));
    }

    #[test]
    fn test_error_without_text_uses_fallback() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        d.dispatch(&mut acc, decode(r#"{"type":"error","error":null}"#));
        assert_eq!(acc.parts()[0].as_text(), Some("Error: Unknown error"));
    }

    #[test]
    fn test_message_end_adopts_status() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        d.dispatch(
            &mut acc,
            decode(r#"{"type":"message-end","status":{"type":"complete","reason":"stop"}}"#),
        );
        assert_eq!(
            acc.status(),
            &RunStatus::complete(json!({"type": "complete", "reason": "stop"}))
        );

        let out = d.dispatch(&mut acc, decode(r#"{"type":"error","error":"late"}"#));
        assert_eq!(out, Dispatch::Ignored);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_unknown_event_ignored() {
        let d = dispatcher();
        let mut acc = Accumulator::new();
        assert_eq!(
            d.dispatch(&mut acc, decode(r#"{"type":"brand-new"}"#)),
            Dispatch::Ignored
        );
    }

    #[test]
    fn test_run_status_from_wire() {
        assert_eq!(
            run_status_from_wire(Some(json!({"type": "incomplete", "reason": "length"}))),
            RunStatus::incomplete("length")
        );
        assert_eq!(
            run_status_from_wire(Some(json!({"type": "incomplete"}))),
            RunStatus::incomplete("other")
        );
        assert_eq!(
            run_status_from_wire(None),
            RunStatus::complete(json!({"type": "complete"}))
        );
        assert!(matches!(
            run_status_from_wire(Some(json!({"type": "requires-action"}))),
            RunStatus::Complete { .. }
        ));
    }

    #[test]
    fn test_side_effects_reported() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |effect: SideEffect| captured.lock().unwrap().push(effect);
        let d = Dispatcher::new(&StreamConfig::default(), Arc::new(sink));
        let mut acc = Accumulator::new();

        d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-call-start","part":{"toolCallId":"1","toolName":"create_file"}}"#),
        );
        d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-result","part":{"toolCallId":"1","result":"{\"path\":\"a.md\"}"}}"#),
        );
        d.dispatch(
            &mut acc,
            decode(
                r#"{"type":"tool-completion","tool":"stagehand_goto","message":"{\"viewerUrl\":\"https://v\",\"sessionId\":\"s\"}"}"#,
            ),
        );
        d.dispatch(
            &mut acc,
            decode(r#"{"type":"tool-completion","tool":"search","message":"done"}"#),
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0],
            SideEffect::FileCreated {
                tool: "create_file".into(),
                result: json!({"path": "a.md"})
            }
        );
        assert!(matches!(
            &seen[1],
            SideEffect::BrowserSession { viewer_url, session_id: Some(s), .. }
                if viewer_url == "https://v" && s == "s"
        ));
    }
}
