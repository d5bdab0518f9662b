// Upstream chat completions SSE frame reader
// Author: kelexine (https://github.com/kelexine)

use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::models::openai::ChatCompletionChunk;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use tracing::{debug, warn};

/// Terminal payload that ends an upstream stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One usable upstream frame.
#[derive(Debug)]
pub enum Frame {
    Chunk(ChatCompletionChunk),
    Done,
}

/// Incremental SSE frame decoder.
///
/// Bytes are decoded as UTF-8 without ever splitting a multi-byte sequence,
/// and only newline-terminated lines are interpreted. Everything after the
/// last newline waits for the next `push`.
#[derive(Debug, Default)]
pub struct FrameReader {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    utf8_tail: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    line_buffer: String,
    done: bool,
    malformed_frames: u64,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and collect every frame completed by them.
    ///
    /// Once [`Frame::Done`] has been returned, further input is ignored.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }

        self.decode(bytes);

        let Some(last_newline) = self.line_buffer.rfind('\n') else {
            return frames;
        };
        let carry = self.line_buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.line_buffer, carry);

        for line in complete.lines() {
            match self.parse_line(line) {
                Some(Frame::Done) => {
                    debug!("Upstream sent {} sentinel", DONE_SENTINEL);
                    self.done = true;
                    self.line_buffer.clear();
                    frames.push(Frame::Done);
                    break;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
        }

        frames
    }

    /// Signal end of input. An unterminated trailing line is dropped.
    pub fn finish(&mut self) {
        if !self.done && !self.line_buffer.trim().is_empty() {
            debug!(
                "Discarding unterminated trailing line: {}",
                self.line_buffer.chars().take(100).collect::<String>()
            );
        }
        self.line_buffer.clear();
        self.utf8_tail.clear();
    }

    /// Whether the terminal sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of `data:` frames skipped because their JSON did not parse.
    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames
    }

    fn decode(&mut self, bytes: &[u8]) {
        self.utf8_tail.extend_from_slice(bytes);
        let input = std::mem::take(&mut self.utf8_tail);
        let mut rest = &input[..];

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.line_buffer.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, remainder) = rest.split_at(e.valid_up_to());
                    self.line_buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Invalid sequence: replace it and keep going
                        Some(len) => {
                            self.line_buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &remainder[len..];
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.utf8_tail = remainder.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    fn parse_line(&mut self, line: &str) -> Option<Frame> {
        let payload = line.strip_prefix("data:")?.trim();
        if payload.is_empty() {
            return None;
        }
        if payload == DONE_SENTINEL {
            return Some(Frame::Done);
        }

        match serde_json::from_str::<ChatCompletionChunk>(payload) {
            Ok(chunk) => Some(Frame::Chunk(chunk)),
            Err(e) => {
                self.malformed_frames += 1;
                metrics::record_frame_error("parse");
                warn!("Skipping malformed upstream frame: {}", e);
                debug!("Raw frame: {}", payload.chars().take(200).collect::<String>());
                None
            }
        }
    }
}

/// Turn an upstream body into a lazy sequence of parsed chunks.
///
/// The sequence ends at `[DONE]`, at end of body, or right after yielding a
/// transport error. Dropping it drops the body.
pub fn chunk_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<ProxyError> + Send + 'static,
{
    async_stream::stream! {
        let mut reader = FrameReader::new();
        futures::pin_mut!(byte_stream);

        'read: while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for frame in reader.push(&bytes) {
                        match frame {
                            Frame::Chunk(chunk) => yield Ok(chunk),
                            Frame::Done => break 'read,
                        }
                    }
                }
                Err(e) => {
                    let err: ProxyError = e.into();
                    warn!("Upstream stream error: {}", err);
                    metrics::record_frame_error("transport");
                    yield Err(err);
                    break;
                }
            }
        }

        reader.finish();
        debug!("Upstream SSE stream ended");
    }
}
