//! Session driver.
//!
//! [`TurnSession`] pulls byte chunks from a source, runs each through a
//! [`TurnAssembler`], and yields the resulting snapshots as a lazy
//! [`Stream`]. It reads one chunk at a time, only after every snapshot
//! from the previous chunk has been taken.
//!
//! The byte source is dropped as soon as the session ends, whether by a
//! terminal event, a fatal error, end of input or cancellation.

use crate::assembler::TurnAssembler;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::side_effects::{NoopSink, SideEffectSink};
use bytes::Bytes;
use futures::stream::FusedStream;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, warn, Span};
use turnstream_core::{Accumulator, SessionId, Snapshot};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing emitted yet.
    Idle,
    /// Reading from the byte source.
    Running,
    /// The run reached a terminal status or the input ended.
    Finished,
    /// Cancelled by the caller.
    Cancelled,
}

pin_project! {
    /// A stream of snapshots for one agent turn.
    ///
    /// The first item is always an empty "started" snapshot, produced before
    /// any bytes are read. The last item carries a terminal status, unless
    /// the session was cancelled.
    pub struct TurnSession<S> {
        #[pin]
        cancelled: WaitForCancellationFutureOwned,
        token: CancellationToken,
        source: Option<S>,
        assembler: TurnAssembler,
        pending: VecDeque<Snapshot>,
        state: SessionState,
        session_id: SessionId,
        span: Span,
    }
}

impl<S, E> TurnSession<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    /// Create a session with the default configuration and no side-effect sink.
    pub fn new(source: S, cancel: CancellationToken) -> Self {
        Self::with_config(source, cancel, &StreamConfig::default(), Arc::new(NoopSink))
    }

    /// Create a session.
    pub fn with_config(
        source: S,
        cancel: CancellationToken,
        config: &StreamConfig,
        sink: Arc<dyn SideEffectSink>,
    ) -> Self {
        let session_id = SessionId::new();
        let span = tracing::debug_span!("turn_session", session_id = %session_id);
        Self {
            cancelled: cancel.clone().cancelled_owned(),
            token: cancel,
            source: Some(source),
            assembler: TurnAssembler::new(config, sink),
            pending: VecDeque::new(),
            state: SessionState::Idle,
            session_id,
            span,
        }
    }

    /// Start from a caller-provided accumulator instead of an empty one.
    #[must_use]
    pub fn with_accumulator(mut self, accumulator: Accumulator) -> Self {
        self.assembler = self.assembler.with_accumulator(accumulator);
        self
    }

    /// Drain the session, returning the last snapshot.
    pub async fn final_snapshot(self) -> Option<Snapshot> {
        self.fold(None, |_, snapshot| async move { Some(snapshot) })
            .await
    }
}

impl<S> TurnSession<S> {
    /// Get the session ID.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Get the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get the accumulator as it stands now.
    pub fn accumulator(&self) -> &Accumulator {
        self.assembler.accumulator()
    }

    /// Check whether the byte source is still held.
    pub fn holds_source(&self) -> bool {
        self.source.is_some()
    }
}

fn release<S>(source: &mut Option<S>) {
    if source.take().is_some() {
        debug!("Byte source released");
    }
}

impl<S, E> Stream for TurnSession<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        let _entered = this.span.enter();

        loop {
            if *this.state == SessionState::Cancelled {
                return Poll::Ready(None);
            }

            if this.token.is_cancelled() {
                debug!("Session cancelled");
                *this.state = SessionState::Cancelled;
                this.pending.clear();
                release(this.source);
                return Poll::Ready(None);
            }

            if let Some(snapshot) = this.pending.pop_front() {
                return Poll::Ready(Some(snapshot));
            }

            match *this.state {
                SessionState::Idle => {
                    *this.state = SessionState::Running;
                    debug!("Session started");
                    return Poll::Ready(Some(this.assembler.snapshot()));
                }
                SessionState::Finished => {
                    release(this.source);
                    return Poll::Ready(None);
                }
                SessionState::Running | SessionState::Cancelled => {}
            }

            if this.cancelled.as_mut().poll(cx).is_ready() {
                continue;
            }

            let Some(source) = this.source.as_mut() else {
                *this.state = SessionState::Finished;
                continue;
            };

            let ended = match source.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.assembler.feed(&bytes));
                    false
                }
                Poll::Ready(Some(Err(e))) => {
                    let err = StreamError::transport(e);
                    warn!(error = %err, "Byte source failed; ending run");
                    this.pending.extend(this.assembler.fail(&err));
                    true
                }
                Poll::Ready(None) => {
                    this.pending.extend(this.assembler.finish());
                    true
                }
                Poll::Pending => return Poll::Pending,
            };

            if ended || this.assembler.is_terminal() {
                debug!(
                    status = %this.assembler.accumulator().status(),
                    "Session finished"
                );
                *this.state = SessionState::Finished;
                release(this.source);
            }
        }
    }
}

impl<S, E> FusedStream for TurnSession<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    fn is_terminated(&self) -> bool {
        matches!(self.state, SessionState::Cancelled)
            || (self.state == SessionState::Finished && self.pending.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side_effects::SideEffect;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use turnstream_core::{RunStatus, REASON_STREAM_ENDED};

    /// Byte source that counts how many times it is closed (dropped).
    struct TrackedSource {
        chunks: VecDeque<Result<Bytes, std::io::Error>>,
        hang_when_empty: bool,
        polls: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl TrackedSource {
        fn new(chunks: &[&str], hang_when_empty: bool) -> (Self, Arc<AtomicUsize>) {
            let closed = Arc::new(AtomicUsize::new(0));
            let source = Self {
                chunks: chunks
                    .iter()
                    .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
                    .collect(),
                hang_when_empty,
                polls: Arc::new(AtomicUsize::new(0)),
                closed: Arc::clone(&closed),
            };
            (source, closed)
        }
    }

    impl Stream for TrackedSource {
        type Item = Result<Bytes, std::io::Error>;

        fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            match self.chunks.pop_front() {
                Some(chunk) => Poll::Ready(Some(chunk)),
                None if self.hang_when_empty => Poll::Pending,
                None => Poll::Ready(None),
            }
        }
    }

    impl Drop for TrackedSource {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    const DELTA_HI: &str = "data: {\"type\":\"text-delta\",\"text\":\"Hi\"}\n\n";
    const END: &str = "data: {\"type\":\"message-end\",\"status\":{\"type\":\"complete\"}}\n\n";

    #[tokio::test]
    async fn test_started_snapshot_before_reading() {
        let (source, _closed) = TrackedSource::new(&[DELTA_HI, END], false);
        let polls = Arc::clone(&source.polls);
        let mut session = Box::pin(TurnSession::new(source, CancellationToken::new()));

        assert_eq!(session.state(), SessionState::Idle);
        let first = session.next().await.unwrap();
        assert_eq!(first, Snapshot::started());
        assert_eq!(polls.load(Ordering::SeqCst), 0);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[tokio::test]
    async fn test_full_session() {
        let (source, closed) = TrackedSource::new(&["data: {\"type\":\"text-", "delta\",\"text\":\"Hi\"}\n\n", END], false);
        let session = TurnSession::new(source, CancellationToken::new());

        let snapshots: Vec<Snapshot> = session.collect().await;
        assert_eq!(snapshots.len(), 3);
        assert!(snapshots[0].parts.is_empty());
        assert_eq!(snapshots[1].text(), "Hi");
        assert!(matches!(snapshots[2].status, RunStatus::Complete { .. }));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_one_chunk_read_per_drain() {
        let two_events = format!("{}{}", DELTA_HI, DELTA_HI);
        let (source, _closed) = TrackedSource::new(&[&two_events, END], false);
        let polls = Arc::clone(&source.polls);
        let mut session = Box::pin(TurnSession::new(source, CancellationToken::new()));

        session.next().await.unwrap();
        let a = session.next().await.unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        let b = session.next().await.unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert_eq!(a.text(), "Hi");
        assert_eq!(b.text(), "HiHi");
    }

    #[tokio::test]
    async fn test_source_released_after_terminal_event() {
        let (source, closed) = TrackedSource::new(&[END], true);
        let mut session = Box::pin(TurnSession::new(source, CancellationToken::new()));

        session.next().await.unwrap();
        let last = session.next().await.unwrap();
        assert!(last.is_terminal());
        assert!(!session.holds_source());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(session.next().await.is_none());
        assert!(session.is_terminated());
    }

    #[tokio::test]
    async fn test_malformed_frame_releases_source() {
        let (source, closed) = TrackedSource::new(&["data: {oops\n\n", DELTA_HI], true);
        let session = TurnSession::new(source, CancellationToken::new());

        let snapshots: Vec<Snapshot> =
            tokio::time::timeout(Duration::from_secs(1), session.collect())
                .await
                .expect("session must not wait on the source after a fatal error");
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[1].status.is_error());
        assert_eq!(snapshots[1].parts.len(), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_between_reads() {
        let token = CancellationToken::new();
        let (source, closed) = TrackedSource::new(&[DELTA_HI], true);
        let mut session = Box::pin(TurnSession::new(source, token.clone()));

        session.next().await.unwrap();
        assert_eq!(session.next().await.unwrap().text(), "Hi");

        token.cancel();
        assert!(session.next().await.is_none());
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        drop(session);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_wakes_pending_read() {
        let token = CancellationToken::new();
        let (source, closed) = TrackedSource::new(&[], true);
        let mut session = Box::pin(TurnSession::new(source, token.clone()));
        session.next().await.unwrap();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let next = tokio::time::timeout(Duration::from_secs(1), session.next())
            .await
            .expect("cancellation must wake the session");
        assert!(next.is_none());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_read_is_woken_by_cancel() {
        let token = CancellationToken::new();
        let (source, closed) = TrackedSource::new(&[], true);
        let mut task = tokio_test::task::spawn(TurnSession::new(source, token.clone()));

        tokio_test::assert_ready_eq!(task.poll_next(), Some(Snapshot::started()));
        tokio_test::assert_pending!(task.poll_next());
        assert!(!task.is_woken());

        token.cancel();
        assert!(task.is_woken());
        tokio_test::assert_ready_eq!(task.poll_next(), None);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_discards_pending_snapshots() {
        let token = CancellationToken::new();
        let two_events = format!("{}{}", DELTA_HI, DELTA_HI);
        let (source, _closed) = TrackedSource::new(&[&two_events], true);
        let mut session = Box::pin(TurnSession::new(source, token.clone()));

        session.next().await.unwrap();
        session.next().await.unwrap();
        token.cancel();
        assert!(session.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_end_without_terminal_event() {
        let (source, closed) = TrackedSource::new(&[DELTA_HI], false);
        let last = TurnSession::new(source, CancellationToken::new())
            .final_snapshot()
            .await
            .unwrap();
        assert_eq!(last.status, RunStatus::incomplete(REASON_STREAM_ENDED));
        assert_eq!(last.text(), "Hi");
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_error_mid_stream() {
        let (mut source, _closed) = TrackedSource::new(&[DELTA_HI], false);
        source.chunks.push_back(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        )));
        let last = TurnSession::new(source, CancellationToken::new())
            .final_snapshot()
            .await
            .unwrap();
        assert!(last.status.is_error());
        assert_eq!(last.parts[1].as_text(), Some("Error: connection reset"));
    }

    #[tokio::test]
    async fn test_side_effect_sink_injected() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |effect: SideEffect| captured.lock().unwrap().push(effect);

        let frames = [
            "data: {\"type\":\"tool-call-start\",\"part\":{\"toolCallId\":\"f\",\"toolName\":\"create_file\"}}\n\n",
            "data: {\"type\":\"tool-result\",\"part\":{\"toolCallId\":\"f\",\"result\":{\"path\":\"notes.md\"}}}\n\n",
            END,
        ];
        let (source, _closed) = TrackedSource::new(&frames, false);
        let session = TurnSession::with_config(
            source,
            CancellationToken::new(),
            &StreamConfig::default(),
            Arc::new(sink),
        );
        let last = session.final_snapshot().await.unwrap();

        assert!(last.tool_calls().all(|c| c.is_completed()));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seeded_accumulator() {
        let (source, _closed) = TrackedSource::new(&[DELTA_HI, END], false);
        let mut seeded = Accumulator::new();
        seeded.append_text("Earlier. ").unwrap();

        let last = TurnSession::new(source, CancellationToken::new())
            .with_accumulator(seeded)
            .final_snapshot()
            .await
            .unwrap();
        assert_eq!(last.text(), "Earlier. Hi");
    }
}
