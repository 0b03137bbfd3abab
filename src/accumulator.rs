//! Reduce a streamed completion into a single answer string.
//!
//! Every frame's `choices[0].delta.content` is appended in arrival order.
//! Malformed frames are skipped with a debug log, and the `[DONE]` sentinel
//! is ignored. A stream that yields no text at all produces [`NO_ANSWER`].

use futures_util::StreamExt;

use crate::error::Result;
use crate::sse::{ByteStream, FrameDecoder, SseFrame, text_chunks};

/// Answer used when the stream carried no text.
pub const NO_ANSWER: &str = "No answer.";

/// A frame whose payload could not be read. Skipped, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed stream frame: {0}")]
pub struct FrameParseError(pub String);

/// Extract the text delta carried by one frame's JSON payload.
///
/// Returns `Ok(None)` for well-formed frames without text (role-only
/// openers, finish markers, empty content).
///
/// # Errors
///
/// [`FrameParseError`] if the payload is not a JSON object.
pub fn parse_delta(data: &str) -> std::result::Result<Option<String>, FrameParseError> {
    let parsed: serde_json::Value =
        serde_json::from_str(data).map_err(|e| FrameParseError(e.to_string()))?;
    if !parsed.is_object() {
        return Err(FrameParseError("payload is not a JSON object".into()));
    }

    let content = parsed
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .filter(|content| !content.is_empty())
        .map(String::from);

    Ok(content)
}

/// Folds frames into an answer.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    answer: String,
    frames: usize,
    skipped: usize,
}

impl StreamAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame.
    pub fn apply(&mut self, frame: &SseFrame) {
        if frame.is_done() {
            return;
        }
        self.frames += 1;
        match parse_delta(&frame.data) {
            Ok(Some(delta)) => self.answer.push_str(&delta),
            Ok(None) => {}
            Err(err) => {
                self.skipped += 1;
                tracing::debug!(%err, "skipping stream frame");
            }
        }
    }

    /// Number of frames skipped as malformed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The final answer, or [`NO_ANSWER`] if nothing was appended.
    pub fn finish(self) -> String {
        tracing::debug!(
            frames = self.frames,
            skipped = self.skipped,
            chars = self.answer.chars().count(),
            "stream accumulated"
        );
        if self.answer.is_empty() {
            NO_ANSWER.to_string()
        } else {
            self.answer
        }
    }
}

/// Consume a completion byte stream and return the answer.
///
/// # Errors
///
/// Returns the transport error if the stream breaks mid-way. Malformed frames
/// are not errors.
pub async fn accumulate(bytes: ByteStream) -> Result<String> {
    let mut chunks = text_chunks(bytes);
    let mut decoder = FrameDecoder::new();
    let mut accumulator = StreamAccumulator::new();

    while let Some(chunk) = chunks.next().await {
        for frame in decoder.push(&chunk?) {
            accumulator.apply(&frame);
        }
    }
    if let Some(frame) = decoder.finish() {
        accumulator.apply(&frame);
    }

    Ok(accumulator.finish())
}

/// Accumulate an already-buffered response body.
pub fn accumulate_text(body: &str) -> String {
    let mut accumulator = StreamAccumulator::new();
    for frame in crate::sse::parse_frames(body) {
        accumulator.apply(&frame);
    }
    accumulator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CitewiseError;
    use bytes::Bytes;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn stream_of(chunks: Vec<Vec<u8>>) -> ByteStream {
        Box::pin(futures_util::stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from(c))),
        ))
    }

    #[test]
    fn parse_delta_text() {
        let data = r#"{"choices":[{"delta":{"content":"Paris"}}]}"#;
        assert_eq!(parse_delta(data), Ok(Some("Paris".into())));
    }

    #[test]
    fn parse_delta_role_only_is_none() {
        let data = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_delta(data), Ok(None));
    }

    #[test]
    fn parse_delta_empty_choices_is_none() {
        assert_eq!(parse_delta(r#"{"choices":[]}"#), Ok(None));
    }

    #[test]
    fn parse_delta_invalid_json_is_error() {
        assert!(parse_delta("{not json").is_err());
        assert!(parse_delta("42").is_err());
    }

    #[test]
    fn two_frames_concatenate() {
        let body = format!("{}{}", frame("A"), frame("B"));
        assert_eq!(accumulate_text(&body), "AB");
    }

    #[test]
    fn zero_frames_is_no_answer() {
        assert_eq!(accumulate_text(""), NO_ANSWER);
        assert_eq!(accumulate_text("data: [DONE]\n\n"), NO_ANSWER);
        assert_eq!(accumulate_text(": keep-alive\n\n"), NO_ANSWER);
    }

    #[test]
    fn malformed_frame_skipped_without_abort() {
        let body = format!("{}data: {{oops\n\n{}", frame("Par"), frame("is"));
        let mut accumulator = StreamAccumulator::new();
        for f in crate::sse::parse_frames(&body) {
            accumulator.apply(&f);
        }
        assert_eq!(accumulator.skipped(), 1);
        assert_eq!(accumulator.finish(), "Paris");
    }

    #[test]
    fn done_sentinel_not_counted_as_malformed() {
        let body = format!("{}data: [DONE]\n\n", frame("x"));
        let mut accumulator = StreamAccumulator::new();
        for f in crate::sse::parse_frames(&body) {
            accumulator.apply(&f);
        }
        assert_eq!(accumulator.skipped(), 0);
    }

    #[tokio::test]
    async fn stream_split_mid_frame_and_mid_char() {
        let body = format!("{}{}data: [DONE]\n\n", frame("Café "), frame("crème"));
        let bytes = body.into_bytes();
        // Byte-sized chunks split every frame and every multi-byte char.
        let chunks = bytes.iter().map(|b| vec![*b]).collect();
        let answer = accumulate(stream_of(chunks)).await.expect("answer");
        assert_eq!(answer, "Café crème");
    }

    #[tokio::test]
    async fn trailing_frame_without_blank_line() {
        let body = format!(
            "{}data: {}",
            frame("A"),
            serde_json::json!({"choices": [{"delta": {"content": "B"}}]})
        );
        let answer = accumulate(stream_of(vec![body.into_bytes()]))
            .await
            .expect("answer");
        assert_eq!(answer, "AB");
    }

    #[tokio::test]
    async fn read_error_is_fatal() {
        let stream: ByteStream = Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from(frame("partial"))),
            Err(CitewiseError::StreamInterrupted("connection reset".into())),
        ]));
        let err = accumulate(stream).await.unwrap_err();
        assert!(matches!(err, CitewiseError::StreamInterrupted(_)));
    }
}
