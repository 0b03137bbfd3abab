//! Server-Sent Events decoding for the completion backend's response.
//!
//! Raw bytes are first turned into a lazy stream of UTF-8 text chunks by
//! [`text_chunks`], which carries incomplete multi-byte sequences over to the
//! next chunk. The text is then fed to a [`FrameDecoder`], a two-state machine
//! that splits it into blank-line-delimited [`SseFrame`]s.
//!
//! # SSE Format
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Par"}}]}
//!
//! : keep-alive comment
//!
//! data: {"choices":[{"delta":{"content":"is"}}]}
//!
//! data: [DONE]
//! ```
//!
//! # Examples
//!
//! ```
//! use citewise::sse::FrameDecoder;
//!
//! let mut decoder = FrameDecoder::new();
//! let frames = decoder.push("data: hel");
//! assert!(frames.is_empty());
//! let frames = decoder.push("lo\n\n");
//! assert_eq!(frames[0].data, "hello");
//! ```

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::Result;

/// A boxed stream of raw response bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A boxed stream of decoded text chunks.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One parsed event of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// The event type (from `event:`). `None` if not specified.
    pub event_type: Option<String>,
    /// The `data:` payload. Multiple data lines are joined with `\n`.
    pub data: String,
}

impl SseFrame {
    /// Whether this frame is the `[DONE]` sentinel.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Where the decoder is relative to frame boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameState {
    /// Between frames: no line of the next frame has been seen yet.
    #[default]
    AwaitingFrame,
    /// Inside a frame: at least one line was read, waiting for a blank line.
    ParsingFrame,
}

/// Incremental frame splitter.
///
/// Feed decoded text with [`FrameDecoder::push`] and call
/// [`FrameDecoder::finish`] at end of stream to flush a trailing frame that
/// never got its closing blank line. Both `\n` and `\r\n` line endings work.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: FrameState,
    line_buffer: String,
    event_type: Option<String>,
    data_lines: Vec<String>,
}

impl FrameDecoder {
    /// Create a decoder in [`FrameState::AwaitingFrame`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Push decoded text; returns every frame completed by it.
    pub fn push(&mut self, text: &str) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut rest = text;

        while let Some(newline) = rest.find('\n') {
            self.line_buffer.push_str(&rest[..newline]);
            rest = &rest[newline + 1..];

            let line = std::mem::take(&mut self.line_buffer);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }
        self.line_buffer.push_str(rest);

        frames
    }

    /// Flush at end of stream.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            self.process_line(line);
        }
        self.end_frame()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return match self.state {
                FrameState::AwaitingFrame => None,
                FrameState::ParsingFrame => self.end_frame(),
            };
        }

        self.state = FrameState::ParsingFrame;

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        if let Some((field, value)) = parse_field(line) {
            match field {
                "data" => self.data_lines.push(value.to_string()),
                "event" => self.event_type = Some(value.to_string()),
                _ => {}
            }
        }
        None
    }

    /// Close the current frame. Frames without data (comment-only,
    /// keep-alives) produce nothing.
    fn end_frame(&mut self) -> Option<SseFrame> {
        self.state = FrameState::AwaitingFrame;
        let event_type = self.event_type.take();
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(SseFrame { event_type, data })
    }
}

/// Parse a line into (field, value). A single leading space is stripped.
fn parse_field(line: &str) -> Option<(&str, &str)> {
    let (field, value) = line.split_once(':')?;
    Some((field, value.strip_prefix(' ').unwrap_or(value)))
}

/// Parse a complete SSE body into frames.
pub fn parse_frames(text: &str) -> Vec<SseFrame> {
    let mut decoder = FrameDecoder::new();
    let mut frames = decoder.push(text);
    frames.extend(decoder.finish());
    frames
}

/// Incremental UTF-8 decoder.
///
/// Bytes of a multi-byte sequence split across chunks are held back until
/// the rest arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + chunk` as is complete.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        let mut consumed = 0;

        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid_up_to + bad;
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more.
                            consumed += valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        out
    }

    /// Flush at end of stream. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}

/// Turn a byte stream into a lazy, single-pass stream of text chunks.
///
/// Empty decodes (a chunk holding only the start of a multi-byte sequence)
/// are not emitted. Transport errors are passed through as-is.
pub fn text_chunks(bytes: ByteStream) -> TextStream {
    let stream = futures_util::stream::unfold(
        ChunkState {
            bytes,
            decoder: Utf8Decoder::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if state.done {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        let text = state.decoder.decode(&chunk);
                        if !text.is_empty() {
                            return Some((Ok(text), state));
                        }
                    }
                    Some(Err(err)) => {
                        state.done = true;
                        return Some((Err(err), state));
                    }
                    None => {
                        state.done = true;
                        let tail = state.decoder.finish();
                        if !tail.is_empty() {
                            return Some((Ok(tail), state));
                        }
                    }
                }
            }
        },
    );
    Box::pin(stream)
}

struct ChunkState {
    bytes: ByteStream,
    decoder: Utf8Decoder,
    done: bool,
}
