//! Anthropic Messages API type definitions.
//!
//! This module defines the request and response structures for the [Anthropic Messages API](https://docs.anthropic.com/en/api/messages).
//! These types are used to deserialize incoming requests from Claude clients and serialize responses back to them.

// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Anthropic Messages API request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    /// The model that will complete your prompt.
    pub model: String,

    /// Input messages.
    pub messages: Vec<Message>,

    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemPrompt>,

    /// The maximum number of tokens to generate before stopping.
    pub max_tokens: u32,

    /// Amount of randomness injected into the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Use nucleus sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Only sample from the top K options. Not forwarded upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Custom text sequences that will cause the model to stop generating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Definitions of tools that the model may use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    /// How the model should use the provided tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Extended thinking configuration. Accepted for compatibility; reasoning
    /// models decide on their own whether to think.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,

    /// Whether to incrementally stream the response using server-sent events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// System prompt can be either a simple string or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl SystemPrompt {
    /// Flatten to a single string (text blocks joined by newlines).
    pub fn to_text(&self) -> String {
        match self {
            SystemPrompt::Text(s) => s.clone(),
            SystemPrompt::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A single message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender ("user" or "assistant").
    pub role: String,
    /// The content of the message.
    pub content: MessageContent,
}

/// Message content - can be simple text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Content block types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text content block.
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    /// Extended thinking block
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// An image content block.
    Image { source: ImageSource },
    /// A tool use request from the model.
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// Result of a tool execution.
    ToolResult {
        /// The ID of the tool use this result corresponds to.
        tool_use_id: String,
        #[serde(default)]
        content: Option<ToolResultContent>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    /// Block kinds this proxy does not translate (e.g. `redacted_thinking`).
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: text.into(),
            cache_control: None,
        }
    }
}

/// Tool result content - can be simple text or structured blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    /// Simple text result.
    Text(String),
    /// Structured result; kept as raw JSON so unknown block kinds survive.
    Blocks(Vec<Value>),
}

impl std::fmt::Display for ToolResultContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolResultContent::Text(s) => write!(f, "{}", s),
            ToolResultContent::Blocks(blocks) => {
                // Text blocks contribute their text, anything else its JSON
                let text = blocks
                    .iter()
                    .map(|block| match (block.get("type"), block.get("text")) {
                        (Some(Value::String(t)), Some(Value::String(text))) if t == "text" => {
                            text.clone()
                        }
                        _ => block.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                write!(f, "{}", text)
            }
        }
    }
}

/// Cache control configuration for prompt caching (accepted, not forwarded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub cache_type: String,
}

/// Image source for vision content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageSource {
    Base64 {
        #[serde(skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
        data: String,
    },
    Url { url: String },
}

impl ImageSource {
    /// URL form accepted by chat completion `image_url` parts.
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Base64 { media_type, data } => format!(
                "data:{};base64,{}",
                media_type.as_deref().unwrap_or("image/png"),
                data
            ),
            ImageSource::Url { url } => url.clone(),
        }
    }
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value, // JSON Schema
}

/// Tool choice directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    Any,
    Tool { name: String },
    None,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
}

/// Anthropic Messages API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    /// Unique object identifier.
    pub id: String,

    /// Object type (always "message").
    #[serde(rename = "type")]
    pub response_type: String,

    /// Conversational role of the generated message (always "assistant").
    pub role: String,

    /// Content generated by the model.
    pub content: Vec<ContentBlock>,

    /// The model that handled the request.
    pub model: String,

    /// The reason why the model stopped generating.
    pub stop_reason: Option<StopReason>,

    /// The sequence that caused the model to stop (if applicable).
    pub stop_sequence: Option<String>,

    /// Billing and rate-limit usage.
    pub usage: Usage,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Usage {
    /// The number of input tokens which were used.
    pub input_tokens: u32,

    /// The number of output tokens which were used.
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// Create a new response with given content
    pub fn new(id: String, model: String, content: Vec<ContentBlock>, usage: Usage) -> Self {
        Self {
            id,
            response_type: "message".to_string(),
            role: "assistant".to_string(),
            content,
            model,
            stop_reason: None,
            stop_sequence: None,
            usage,
        }
    }
}

/// Extended thinking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingConfig {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default)]
    pub budget_tokens: Option<u32>,
}

/// Response body for `GET /v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelInfo>,
    pub has_more: bool,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
}

/// One entry of [`ModelList`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_with_block_content() {
        let req: MessagesRequest = serde_json::from_value(json!({
            "model": "m",
            "max_tokens": 16,
            "system": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}],
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "hi"},
                    {"type": "tool_result", "tool_use_id": "t1", "content": "ok"}
                ]
            }],
            "tool_choice": {"type": "tool", "name": "lookup"}
        }))
        .unwrap();

        assert_eq!(req.system.unwrap().to_text(), "a\nb");
        assert_eq!(req.tool_choice, Some(ToolChoice::Tool { name: "lookup".to_string() }));
        match &req.messages[0].content {
            MessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            other => panic!("expected blocks, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_result_blocks_display() {
        let content = ToolResultContent::Blocks(vec![
            json!({"type": "text", "text": "line one"}),
            json!({"type": "image", "source": {"type": "url", "url": "u"}}),
        ]);
        let rendered = content.to_string();
        assert!(rendered.starts_with("line one\n"));
        assert!(rendered.contains("\"image\""));
    }

    #[test]
    fn test_image_source_url() {
        let source = ImageSource::Base64 {
            media_type: Some("image/jpeg".to_string()),
            data: "AAAA".to_string(),
        };
        assert_eq!(source.to_url(), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_stop_reason_serialization() {
        assert_eq!(serde_json::to_value(StopReason::ToolUse).unwrap(), json!("tool_use"));
        assert_eq!(serde_json::to_value(StopReason::MaxTokens).unwrap(), json!("max_tokens"));
    }
}
