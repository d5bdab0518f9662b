// Anthropic SSE streaming event types
// Author: kelexine (https://github.com/kelexine)

use super::anthropic::{StopReason, Usage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// All Anthropic SSE event types this proxy emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: u32,
        content_block: ContentBlockStart,
    },
    ContentBlockDelta {
        index: u32,
        delta: Delta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessageDeltaData,
        usage: DeltaUsage,
    },
    MessageStop,
    Error {
        error: ErrorData,
    },
}

/// Message start event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStart {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String, // "message"
    pub role: String,         // "assistant"
    pub content: Vec<Value>,  // always empty at start
    pub model: String,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

impl MessageStart {
    pub fn new(id: String, model: String) -> Self {
        Self {
            id,
            message_type: "message".to_string(),
            role: "assistant".to_string(),
            content: vec![],
            model,
            stop_reason: None,
            stop_sequence: None,
            usage: Usage::default(),
        }
    }
}

/// Content block start event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockStart {
    Thinking { thinking: String },
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

impl ContentBlockStart {
    pub fn thinking() -> Self {
        ContentBlockStart::Thinking {
            thinking: String::new(),
        }
    }

    pub fn text() -> Self {
        ContentBlockStart::Text {
            text: String::new(),
        }
    }

    pub fn tool_use(id: String, name: String) -> Self {
        ContentBlockStart::ToolUse {
            id,
            name,
            input: Value::Object(Default::default()),
        }
    }
}

/// Delta types for content_block_delta events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    ThinkingDelta { thinking: String },
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

/// Message delta event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDeltaData {
    pub stop_reason: StopReason,
    pub stop_sequence: Option<String>,
}

/// Usage delta for message_delta events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaUsage {
    pub output_tokens: u32,
}

/// Error event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl StreamEvent {
    /// SSE `event:` name, identical to the payload's `type`.
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::MessageStart { .. } => "message_start",
            StreamEvent::ContentBlockStart { .. } => "content_block_start",
            StreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            StreamEvent::ContentBlockStop { .. } => "content_block_stop",
            StreamEvent::MessageDelta { .. } => "message_delta",
            StreamEvent::MessageStop => "message_stop",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Format as Server-Sent Event
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());

        format!("event: {}\ndata: {}\n\n", self.event_name(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_start_sse_format() {
        let event = StreamEvent::MessageStart {
            message: MessageStart::new("msg_123".to_string(), "kimi-k2".to_string()),
        };

        let sse = event.to_sse();
        assert!(sse.starts_with("event: message_start\n"));
        assert!(sse.ends_with("\n\n"));

        let data: Value = serde_json::from_str(
            sse.lines().nth(1).unwrap().strip_prefix("data: ").unwrap(),
        )
        .unwrap();
        assert_eq!(data["message"]["content"], json!([]));
        assert_eq!(data["message"]["stop_reason"], Value::Null);
        assert_eq!(data["message"]["usage"], json!({"input_tokens": 0, "output_tokens": 0}));
    }

    #[test]
    fn test_block_start_payloads() {
        let thinking = serde_json::to_value(ContentBlockStart::thinking()).unwrap();
        assert_eq!(thinking, json!({"type": "thinking", "thinking": ""}));

        let tool = serde_json::to_value(ContentBlockStart::tool_use(
            "t1".to_string(),
            "lookup".to_string(),
        ))
        .unwrap();
        assert_eq!(tool, json!({"type": "tool_use", "id": "t1", "name": "lookup", "input": {}}));
    }

    #[test]
    fn test_content_block_delta_sse_format() {
        let event = StreamEvent::ContentBlockDelta {
            index: 2,
            delta: Delta::InputJsonDelta {
                partial_json: "{\"q\":".to_string(),
            },
        };

        let sse = event.to_sse();
        assert!(sse.starts_with("event: content_block_delta\n"));
        assert!(sse.contains("\"type\":\"input_json_delta\""));
        assert!(sse.contains("\"partial_json\":\"{\\\"q\\\":\""));
    }

    #[test]
    fn test_message_delta_payload() {
        let event = StreamEvent::MessageDelta {
            delta: MessageDeltaData {
                stop_reason: StopReason::EndTurn,
                stop_sequence: None,
            },
            usage: DeltaUsage { output_tokens: 7 },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "message_delta",
                "delta": {"stop_reason": "end_turn", "stop_sequence": null},
                "usage": {"output_tokens": 7}
            })
        );
    }

    #[test]
    fn test_message_stop_sse_format() {
        let event = StreamEvent::MessageStop;
        let sse = event.to_sse();
        assert_eq!(
            sse,
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n"
        );
    }
}
