//! Data models for the Anthropic and OpenAI-compatible APIs.
//!
//! This module contains the type definitions for request/response bodies used by:
//! - The inbound Anthropic-compatible API (`anthropic`)
//! - The upstream chat completions API (`openai`)
//! - Model name resolution (`mapping`)
//! - Outgoing streaming event types (`streaming`)

// Author: kelexine (https://github.com/kelexine)

pub mod anthropic;
pub mod mapping;
pub mod openai;
pub mod streaming;

pub use anthropic::{ContentBlock, Message, MessageContent, MessagesRequest, MessagesResponse, StopReason, Tool, Usage};
pub use mapping::resolve_model;
pub use openai::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, FinishReason};
pub use streaming::*;
