//! Server-Sent Events framing.
//!
//! Splits decoded text into frames on blank lines. Only frames carrying a
//! `data:` field produce an [`SseFrame`]; comment and keepalive frames are
//! dropped.
//!
//! Frame size is measured on the frame text without its trailing line
//! breaks, so the same stream is accepted or rejected regardless of how it
//! was chunked.

use std::collections::VecDeque;

/// Field prefix marking a frame payload line.
pub const DATA_PREFIX: &str = "data:";

/// Longest frame delimiter (`\r\n\r\n`), minus one.
const DELIMITER_OVERLAP: usize = 3;

const LINE_BREAKS: [char; 2] = ['\n', '\r'];

/// A complete frame with a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Payload; multiple `data:` lines are joined with `\n`.
    pub data: String,
}

impl SseFrame {
    /// Create a frame with the given payload.
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// Splits a text stream into frames.
///
/// Text is appended as it arrives; complete frames are returned in order
/// and the unterminated remainder is kept for the next call. A frame longer
/// than the configured limit stops the splitter: frames before it are
/// still returned, and [`overflowed`](Self::overflowed) reports the fault.
#[derive(Debug)]
pub struct FrameSplitter {
    buffer: String,
    /// Offset where the next boundary search starts.
    scan_from: usize,
    max_frame_bytes: usize,
    overflowed: bool,
}

impl Default for FrameSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSplitter {
    /// Create a splitter without a frame size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_bytes(usize::MAX)
    }

    /// Create a splitter rejecting frames longer than `limit` bytes.
    #[must_use]
    pub fn with_max_frame_bytes(limit: usize) -> Self {
        Self {
            buffer: String::new(),
            scan_from: 0,
            max_frame_bytes: limit,
            overflowed: false,
        }
    }

    /// Feed decoded text, returning every frame it completes.
    pub fn feed_str(&mut self, s: &str) -> VecDeque<SseFrame> {
        let mut frames = VecDeque::new();
        if self.overflowed {
            return frames;
        }

        self.buffer.push_str(s);
        self.trim_leading_breaks();

        while let Some((pos, delimiter_len)) = self.find_frame_boundary() {
            let raw: String = self.buffer.drain(..pos + delimiter_len).collect();
            self.scan_from = 0;
            self.trim_leading_breaks();

            let frame = &raw[..pos];
            if self.exceeds_limit(frame) {
                return frames;
            }
            if let Some(frame) = parse_frame(frame) {
                frames.push_back(frame);
            }
        }

        // The tail is a prefix of the next frame up to its trailing breaks.
        let tail = std::mem::take(&mut self.buffer);
        if !self.exceeds_limit(&tail) {
            self.scan_from = tail.len().saturating_sub(DELIMITER_OVERLAP);
            self.buffer = tail;
        }

        frames
    }

    /// Call when the stream ends to flush an unterminated final frame.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        self.scan_from = 0;
        if self.overflowed || rest.trim().is_empty() || self.exceeds_limit(&rest) {
            return None;
        }
        parse_frame(rest.trim_end_matches(LINE_BREAKS))
    }

    /// Bytes of text waiting for a frame boundary.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Check whether a frame exceeded the size limit.
    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Get the frame size limit in bytes.
    #[must_use]
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    fn exceeds_limit(&mut self, frame: &str) -> bool {
        if frame.trim_end_matches(LINE_BREAKS).len() > self.max_frame_bytes {
            self.overflowed = true;
            self.buffer.clear();
            self.scan_from = 0;
        }
        self.overflowed
    }

    fn trim_leading_breaks(&mut self) {
        let leading = self.buffer.len() - self.buffer.trim_start_matches(LINE_BREAKS).len();
        if leading > 0 {
            self.buffer.drain(..leading);
            self.scan_from = self.scan_from.saturating_sub(leading);
        }
    }

    fn find_frame_boundary(&self) -> Option<(usize, usize)> {
        let bytes = self.buffer.as_bytes();
        let newline = find_from(bytes, b"\n\n", self.scan_from).map(|pos| (pos, 2));
        let carriage = find_from(bytes, b"\r\n\r\n", self.scan_from).map(|pos| (pos, 4));

        match (newline, carriage) {
            (Some(nl), Some(cr)) => Some(if cr.0 < nl.0 { cr } else { nl }),
            (Some(nl), None) => Some(nl),
            (None, Some(cr)) => Some(cr),
            (None, None) => None,
        }
    }
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn parse_frame(s: &str) -> Option<SseFrame> {
    let data_lines: Vec<&str> = s
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    if data_lines.is_empty() {
        return None;
    }

    Some(SseFrame::new(data_lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn feed_all(splitter: &mut FrameSplitter, s: &str) -> Vec<SseFrame> {
        splitter.feed_str(s).into_iter().collect()
    }

    #[test]
    fn test_splitter_basic() {
        let mut splitter = FrameSplitter::new();
        let frames = feed_all(&mut splitter, "data: hello\n\n");
        assert_eq!(frames, vec![SseFrame::new("hello")]);
        assert_eq!(splitter.buffered_len(), 0);
    }

    #[test]
    fn test_splitter_multiple_frames_in_order() {
        let mut splitter = FrameSplitter::new();
        let frames = feed_all(&mut splitter, "data: first\n\ndata: second\n\ndata: thi");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "first");
        assert_eq!(frames[1].data, "second");
        assert_eq!(splitter.buffered_len(), "data: thi".len());
    }

    #[test]
    fn test_splitter_incremental() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.feed_str("data: hel").is_empty());
        assert!(splitter.feed_str("lo\n").is_empty());
        let frames = feed_all(&mut splitter, "\n");
        assert_eq!(frames, vec![SseFrame::new("hello")]);
    }

    #[test]
    fn test_splitter_crlf() {
        let mut splitter = FrameSplitter::new();
        let frames = feed_all(&mut splitter, "data: a\r\n\r\ndata: b\r\n\r\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].data, "b");
    }

    #[test]
    fn test_splitter_crlf_split_across_feeds() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.feed_str("data: a\r\n\r").is_empty());
        let frames = feed_all(&mut splitter, "\ndata: b\r");
        assert_eq!(frames, vec![SseFrame::new("a")]);
        assert_eq!(feed_all(&mut splitter, "\n\r\n"), vec![SseFrame::new("b")]);
    }

    #[test]
    fn test_splitter_drops_comments_and_keepalives() {
        let mut splitter = FrameSplitter::new();
        let frames = feed_all(&mut splitter, ": ping\n\nevent: noop\n\ndata: x\n\n");
        assert_eq!(frames, vec![SseFrame::new("x")]);
    }

    #[test]
    fn test_splitter_multiline_data_ignores_other_fields() {
        let mut splitter = FrameSplitter::new();
        let frames = feed_all(&mut splitter, "event: msg\nid: 7\ndata: a\ndata:b\n\n");
        assert_eq!(frames, vec![SseFrame::new("a\nb")]);
    }

    #[test]
    fn test_splitter_extra_blank_lines() {
        let mut splitter = FrameSplitter::new();
        let frames = feed_all(&mut splitter, "data: a\n\n\n\ndata: b\n\n");
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_finish_flushes_tail() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.feed_str("data: tail\n").is_empty());
        assert_eq!(splitter.finish(), Some(SseFrame::new("tail")));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_oversized_frame_stops_splitter() {
        let mut splitter = FrameSplitter::with_max_frame_bytes(12);
        let frames = feed_all(&mut splitter, "data: ok\n\ndata: far too long\n\ndata: x\n\n");
        assert_eq!(frames, vec![SseFrame::new("ok")]);
        assert!(splitter.overflowed());
        assert!(splitter.feed_str("data: y\n\n").is_empty());
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_frame_at_limit_is_accepted() {
        let frame = "data: 123456";
        let mut splitter = FrameSplitter::with_max_frame_bytes(frame.len());
        assert_eq!(
            feed_all(&mut splitter, &format!("{frame}\r\n\r\n")),
            vec![SseFrame::new("123456")]
        );
        assert!(!splitter.overflowed());
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    #[case(8)]
    #[case(64)]
    fn test_limit_independent_of_chunking(#[case] chunk_size: usize) {
        let input = "data: short\n\n\n: a long keepalive comment\n\ndata: tail\r\n\r\n";
        let limit = 14;

        let run = |size: usize| {
            let mut splitter = FrameSplitter::with_max_frame_bytes(limit);
            let mut frames = Vec::new();
            for chunk in input.as_bytes().chunks(size) {
                frames.extend(splitter.feed_str(std::str::from_utf8(chunk).unwrap()));
            }
            frames.extend(splitter.finish());
            (frames, splitter.overflowed())
        };

        let whole = run(input.len());
        assert_eq!(whole, (vec![SseFrame::new("short")], true));
        assert_eq!(run(chunk_size), whole);
    }
}
