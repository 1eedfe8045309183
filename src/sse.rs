//! Stream decoding for agent responses.
//!
//! The agent answers `/start` and `/prompt` with a newline-delimited body in the
//! server-sent-events style:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//! data: {"choices":[{"delta":{"tool_calls":[{"id":"call_1","function":{...}}]}}]}
//! data: [DONE]
//! ```
//!
//! Decoding happens in three stages, each usable on its own:
//!
//! ```text
//! HTTP body bytes
//!     │
//!     │ LineDecoder::push()      reassembles lines split across body chunks
//!     ▼
//! complete lines
//!     │
//!     │ classify_line()          "data: " prefix, [DONE] sentinel, JSON decode
//!     ▼
//! SseLine::{Ignored, Done, Delta, Malformed}
//!     │
//!     │ StreamAccumulator::apply()
//!     ▼
//! AssistantTurn { text, tool_calls }
//! ```
//!
//! # Tool call fragments
//!
//! Unlike index-keyed aggregation, fragments are **not** merged. Every non-null
//! `tool_calls` list is appended in arrival order and sent back to the agent
//! verbatim, so the agent sees exactly what it emitted.

use crate::types::{StreamChunk, StreamDelta, ToolCall};
use crate::{Error, Result};

/// Prefix marking a significant line
pub const DATA_PREFIX: &str = "data: ";

/// Payload sentinel that ends the stream; matched as a substring
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest partial line [`LineDecoder`] buffers before failing the stream
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024; // 16 MiB

/// Classification of one line of the agent stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Blank line, comment, or any line without the `data: ` prefix
    Ignored,

    /// End-of-stream sentinel; nothing after it is read
    Done,

    /// Decoded delta from the first choice. `None` when the payload was valid
    /// JSON without any choice.
    Delta(Option<StreamDelta>),

    /// Payload that is not valid JSON of the expected shape
    Malformed(String),
}

/// Classifies a single line, already stripped of its line terminator.
pub fn classify_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return SseLine::Ignored;
    };

    if payload.contains(DONE_SENTINEL) {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => SseLine::Delta(chunk.into_delta()),
        Err(_) => SseLine::Malformed(payload.to_string()),
    }
}

/// Splits a byte stream into lines.
///
/// HTTP body chunks can end anywhere, including inside a line or inside a
/// multi-byte UTF-8 sequence. Bytes are buffered until a `\n` arrives, so a
/// line is only decoded once it is complete. A trailing `\r` is dropped.
///
/// A partial line may hold at most `limit` bytes ([`MAX_LINE_BYTES`] by
/// default). A body that keeps sending data without a newline fails with
/// [`Error::Stream`] instead of growing the buffer forever.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    limit: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit,
        }
    }

    /// Feeds a body chunk and returns every line it completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stream`] when the unfinished line exceeds the limit.
    /// The buffer is discarded, so the decoder should not be reused.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.buffer[start..end]));
            start = end + 1;
        }
        self.buffer.drain(..start);

        if self.buffer.len() > self.limit {
            self.buffer.clear();
            return Err(Error::stream(format!(
                "stream line exceeded {} bytes without a newline",
                self.limit
            )));
        }
        Ok(lines)
    }

    /// Returns the final line when the body ended without a newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Text and tool calls collected from one streamed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantTurn {
    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Accumulates deltas of a single response.
///
/// The accumulator does not print; [`apply`](Self::apply) hands back the text
/// fragment that should be echoed so callers decide where output goes.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    turn: AssistantTurn,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a delta in and returns its text fragment, if it carried a non-empty one.
    pub fn apply(&mut self, delta: StreamDelta) -> Option<String> {
        if let Some(calls) = delta.tool_calls {
            self.turn.tool_calls.extend(calls);
        }

        match delta.content {
            Some(text) if !text.is_empty() => {
                self.turn.text.push_str(&text);
                Some(text)
            }
            _ => None,
        }
    }

    pub fn text(&self) -> &str {
        &self.turn.text
    }

    pub fn finish(self) -> AssistantTurn {
        self.turn
    }
}
