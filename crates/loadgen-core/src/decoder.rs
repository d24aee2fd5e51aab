//! Incremental decoding of OpenAI-style `text/event-stream` bodies.
//!
//! Transport chunks go through a [`LineBuffer`] which yields whole lines; each
//! line is classified into a [`Frame`] by [`classify`] and folded into a
//! [`DecoderState`]. Malformed payloads are counted and skipped, never raised.

use loadgen_common::Endpoint;
use serde_json::Value;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Reassembles lines from chunks whose boundaries need not match line boundaries.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self { Self::default() }

    /// Appends a chunk and returns every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Flushes a trailing line that was never terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() { return None; }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Classification of a single line of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Frame separator.
    Blank,
    /// Comment or non-`data` field.
    Ignored,
    Done,
    Malformed(String),
    /// Parsed, but carried no choice to read from.
    NoContent,
    /// A chat choice whose content was missing, null or empty.
    EmptyContent,
    Content(String),
}

pub fn classify(line: &str, endpoint: Endpoint) -> Frame {
    if line.is_empty() { return Frame::Blank; }
    let Some(data) = line.strip_prefix(DATA_PREFIX) else { return Frame::Ignored };
    let data = data.trim();
    if data == DONE_SENTINEL { return Frame::Done; }
    match serde_json::from_str::<Value>(data) {
        Ok(value) => extract(&value, endpoint),
        Err(err) => Frame::Malformed(err.to_string()),
    }
}

fn extract(value: &Value, endpoint: Endpoint) -> Frame {
    let Some(choice) = value.get("choices").and_then(Value::as_array).and_then(|c| c.first()) else {
        return Frame::NoContent;
    };
    match endpoint {
        Endpoint::Chat => {
            // reasoning deltas live beside `content` and are never read
            let content = match choice.get("delta").and_then(|d| d.get("content")) {
                None | Some(Value::Null) => choice.get("message").and_then(|m| m.get("content")),
                Some(content) => Some(content),
            };
            match content.and_then(Value::as_str) {
                Some(text) if !text.is_empty() => Frame::Content(text.to_string()),
                _ => Frame::EmptyContent,
            }
        }
        Endpoint::Completion => match choice.get("text").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => Frame::Content(text.to_string()),
            _ => Frame::NoContent,
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderState {
    pub text: String,
    pub chunk_count: usize,
    pub empty_content_count: usize,
    pub total_lines_seen: usize,
    pub parse_error_count: usize,
}

impl DecoderState {
    pub fn apply(&mut self, frame: &Frame) {
        if *frame == Frame::Blank { return; }
        self.total_lines_seen += 1;
        match frame {
            Frame::Malformed(_) => self.parse_error_count += 1,
            Frame::EmptyContent => self.empty_content_count += 1,
            Frame::Content(text) => {
                self.text.push_str(text);
                self.chunk_count += 1;
            }
            Frame::Blank | Frame::Ignored | Frame::Done | Frame::NoContent => {}
        }
    }
}

/// Single-pass decoder for one response body. Once `[DONE]` is seen every further line is dropped.
#[derive(Debug)]
pub struct StreamDecoder {
    endpoint: Endpoint,
    state: DecoderState,
    finished: bool,
    debug: bool,
}

impl StreamDecoder {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, state: DecoderState::default(), finished: false, debug: false }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Feeds one line; returns `false` once the stream is complete.
    pub fn feed_line(&mut self, line: &str) -> bool {
        if self.finished { return false; }
        let frame = classify(line, self.endpoint);
        if self.debug { self.trace_parsed(line, &frame); }
        self.state.apply(&frame);
        if self.debug { self.trace(&frame); }
        if frame == Frame::Done { self.finished = true; }
        !self.finished
    }

    pub fn feed_lines<I, S>(&mut self, lines: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            if !self.feed_line(line.as_ref()) { break; }
        }
        !self.finished
    }

    pub fn is_finished(&self) -> bool { self.finished }
    pub fn state(&self) -> &DecoderState { &self.state }
    pub fn text(&self) -> &str { &self.state.text }
    pub fn finish(self) -> DecoderState { self.state }

    fn trace_parsed(&self, line: &str, frame: &Frame) {
        let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line).trim();
        match frame {
            Frame::Malformed(err) => {
                tracing::debug!(target: "decoder", "parse error: {} for data: {}", err, truncate_chars(payload, 100))
            }
            Frame::NoContent | Frame::EmptyContent | Frame::Content(_) if self.state.chunk_count < 3 => {
                tracing::debug!(target: "decoder", "chunk {}: {}", self.state.chunk_count, truncate_chars(payload, 200))
            }
            _ => {}
        }
    }

    fn trace(&self, frame: &Frame) {
        let s = &self.state;
        match frame {
            Frame::Done => tracing::debug!(
                target: "decoder",
                lines = s.total_lines_seen,
                chunks = s.chunk_count,
                empty = s.empty_content_count,
                parse_errors = s.parse_error_count,
                text_len = s.text.chars().count(),
                "stream ended"
            ),
            Frame::Content(text) => tracing::debug!(target: "decoder", "found content: {}", truncate_chars(text, 50)),
            _ => {}
        }
    }
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
