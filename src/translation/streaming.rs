// SSE event translation for streaming responses
// Author: kelexine (https://github.com/kelexine)

use super::blocks::BlockTracker;
use super::think_tags::{Channel, ThinkSplitter};
use super::tool_calls::{stop_reason, ToolCallAggregator};
use crate::error::Result;
use crate::metrics;
use crate::models::anthropic::Usage;
use crate::models::openai::{ChatCompletionChunk, ChunkChoice, FinishReason};
use crate::models::streaming::*;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::{debug, info, warn};

/// Lifecycle of one outgoing message stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    Closing,
    Closed,
}

/// Translates chat completion chunks into Anthropic SSE events.
///
/// One instance serves exactly one response. Inline `<think>` spans and
/// `reasoning_content` become thinking blocks, tool call fragments become
/// tool_use blocks, and the close sequence runs exactly once.
pub struct StreamTranslator {
    message_id: String,
    model: String,
    state: StreamState,
    splitter: ThinkSplitter,
    blocks: BlockTracker,
    tools: ToolCallAggregator,
    usage: Usage,
}

impl StreamTranslator {
    pub fn new(model: String) -> Self {
        Self::with_message_id(format!("msg_{}", uuid::Uuid::new_v4().simple()), model)
    }

    pub fn with_message_id(message_id: String, model: String) -> Self {
        Self {
            message_id,
            model,
            state: StreamState::Streaming,
            splitter: ThinkSplitter::default(),
            blocks: BlockTracker::new(),
            tools: ToolCallAggregator::new(),
            usage: Usage::default(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    /// Latest cumulative usage reported upstream.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// The `message_start` event; sent before any upstream data is read.
    pub fn start(&self) -> StreamEvent {
        StreamEvent::MessageStart {
            message: MessageStart::new(self.message_id.clone(), self.model.clone()),
        }
    }

    /// Translate one upstream chunk into zero or more events.
    ///
    /// A chunk carrying a finish reason also produces the full close
    /// sequence. Chunks arriving after close are ignored.
    pub fn translate_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.state != StreamState::Streaming {
            return events;
        }

        // Upstream reports running totals: last write wins
        if let Some(usage) = chunk.usage {
            self.usage = Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            };
        }

        let Some(ChunkChoice {
            delta,
            finish_reason,
            ..
        }) = chunk.choices.into_iter().next()
        else {
            return events;
        };

        if let Some(reasoning) = delta.reasoning_content {
            self.blocks.thinking_delta(reasoning, &mut events);
        }

        if let Some(content) = delta.content {
            for (channel, text) in self.splitter.push(&content) {
                self.route(channel, text, &mut events);
            }
        }

        if !delta.tool_calls.is_empty() {
            // Text held back for a possible tag must not trail the tool block
            self.flush_text(&mut events);
            for (position, tool_call) in delta.tool_calls.into_iter().enumerate() {
                self.tools.apply(position, tool_call, &mut self.blocks, &mut events);
            }
        }

        if let Some(reason) = finish_reason {
            debug!("Upstream finished with reason: {:?}", reason);
            events.extend(self.finish(Some(&reason)));
        }

        events
    }

    /// Run the close sequence: flush held-back text, close the open
    /// thinking/text block, close tool blocks, then `message_delta` and
    /// `message_stop`. Returns nothing if already closed.
    pub fn finish(&mut self, finish_reason: Option<&FinishReason>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.state != StreamState::Streaming {
            return events;
        }
        self.state = StreamState::Closing;

        self.flush_text(&mut events);
        self.blocks.close_active(&mut events);
        self.tools.close_all(&self.blocks, &mut events);

        let stop_reason = stop_reason(finish_reason, self.tools.has_calls());
        events.push(StreamEvent::MessageDelta {
            delta: MessageDeltaData {
                stop_reason,
                stop_sequence: None,
            },
            usage: DeltaUsage {
                output_tokens: self.usage.output_tokens,
            },
        });
        events.push(StreamEvent::MessageStop);

        self.state = StreamState::Closed;
        debug!(
            "Closed stream {}: {} blocks, stop_reason={:?}",
            self.message_id,
            self.blocks.started(),
            stop_reason
        );
        events
    }

    fn route(&mut self, channel: Channel, text: String, events: &mut Vec<StreamEvent>) {
        match channel {
            Channel::Thinking => self.blocks.thinking_delta(text, events),
            Channel::Visible => self.blocks.text_delta(text, events),
        }
    }

    fn flush_text(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some((channel, text)) = self.splitter.flush() {
            self.route(channel, text, events);
        }
    }
}

/// Tracks how an SSE connection ended. Dropping it unfinished means the
/// client went away mid-stream.
struct ConnectionGuard {
    finished: bool,
}

impl ConnectionGuard {
    fn opened() -> Self {
        metrics::record_sse_connection("opened");
        Self { finished: false }
    }

    fn finish(&mut self, status: &str) {
        metrics::record_sse_connection(status);
        self.finished = true;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Client disconnected before the stream completed; upstream released");
            metrics::record_sse_connection("cancelled");
        }
    }
}

fn encode(event: &StreamEvent) -> Bytes {
    metrics::record_sse_event(event.event_name());
    Bytes::from(event.to_sse())
}

/// Drive one upstream chunk stream to a downstream SSE byte stream.
///
/// `message_start` goes out before the first upstream read. Each chunk is
/// fully translated and its events yielded before the next read, so a slow
/// client throttles the upstream. `[DONE]` or end of body closes the message
/// normally. A transport error yields an `error` event and ends the body.
/// Dropping the returned stream drops the upstream body.
pub fn transcode<S>(
    chunks: S,
    translator: StreamTranslator,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Send
where
    S: Stream<Item = Result<ChatCompletionChunk>> + Send + 'static,
{
    async_stream::stream! {
        let mut translator = translator;
        let mut guard = ConnectionGuard::opened();
        let mut chunk_count = 0usize;

        yield Ok(encode(&translator.start()));

        futures::pin_mut!(chunks);
        loop {
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    chunk_count += 1;
                    let events = translator.translate_chunk(chunk);
                    debug!("Translated chunk #{} to {} events", chunk_count, events.len());
                    for event in events {
                        yield Ok(encode(&event));
                    }
                    if translator.is_closed() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!("Upstream stream failed after {} chunks: {}", chunk_count, e);
                    let error_event = StreamEvent::Error {
                        error: ErrorData {
                            error_type: "api_error".to_string(),
                            message: e.to_string(),
                        },
                    };
                    yield Ok(encode(&error_event));
                    guard.finish("error");
                    break;
                }
                None => {
                    // [DONE] or plain end of body
                    for event in translator.finish(None) {
                        yield Ok(encode(&event));
                    }
                    break;
                }
            }
        }

        if translator.is_closed() {
            let usage = translator.usage();
            metrics::record_tokens(translator.model(), usage.input_tokens, usage.output_tokens);
            guard.finish("completed");
            info!(
                "Stream {} completed: {} chunks, input_tokens={}, output_tokens={}",
                translator.message_id(),
                chunk_count,
                usage.input_tokens,
                usage.output_tokens
            );
        }
    }
}
