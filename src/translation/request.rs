// Request translation (Anthropic → chat completions)
// Author: kelexine (https://github.com/kelexine)

use crate::error::{ProxyError, Result};
use crate::models::anthropic::{
    ContentBlock, Message, MessageContent, MessagesRequest, Tool, ToolChoice,
};
use crate::models::mapping::resolve_model;
use crate::models::openai::{
    ChatCompletionRequest, ChatContent, ChatMessage, ChatTool, ChatToolCall, ChatToolChoice,
    ContentPart, FunctionCall, FunctionDefinition, FunctionName, ImageUrl, NamedToolChoice,
};
use std::collections::HashMap;
use tracing::debug;

/// Translate an Anthropic MessagesRequest into a chat completions request.
///
/// The model name is resolved through `model_map`; `stream` is forwarded as
/// the client asked.
pub fn translate_request(
    request: MessagesRequest,
    model_map: &HashMap<String, String>,
) -> Result<ChatCompletionRequest> {
    let model = resolve_model(&request.model, model_map);
    debug!("Translating request: {} -> {}", request.model, model);

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(ChatMessage::text("system", system.to_text()));
    }
    for message in request.messages {
        messages.extend(translate_message(message)?);
    }

    let tools = request
        .tools
        .filter(|tools| !tools.is_empty())
        .map(translate_tools);

    // tool_choice without tools is rejected by most upstreams
    let tool_choice = if tools.is_some() {
        request.tool_choice.as_ref().map(translate_tool_choice)
    } else {
        None
    };

    debug!(
        "Translated request: {} messages, tools: {}, tool_choice: {}",
        messages.len(),
        tools.as_ref().map_or(0, Vec::len),
        tool_choice.is_some()
    );

    Ok(ChatCompletionRequest {
        model,
        messages,
        max_tokens: request.max_tokens,
        stream: request.stream.unwrap_or(false),
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop_sequences.filter(|s| !s.is_empty()),
        tools,
        tool_choice,
    })
}

/// Translate one Anthropic message into one or more chat messages.
fn translate_message(message: Message) -> Result<Vec<ChatMessage>> {
    if message.role != "user" && message.role != "assistant" {
        return Err(ProxyError::InvalidRequest(format!(
            "Invalid role: {}. Must be 'user' or 'assistant'.",
            message.role
        )));
    }
    let role = message.role;

    let blocks = match message.content {
        MessageContent::Text(text) => return Ok(vec![ChatMessage::text(&role, text)]),
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut parts: Vec<ContentPart> = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_results = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text, .. } => parts.push(ContentPart::Text { text }),
            ContentBlock::Image { source } => parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: source.to_url(),
                },
            }),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(ChatToolCall {
                id,
                call_type: "function".to_string(),
                function: FunctionCall {
                    name,
                    arguments: serde_json::to_string(&input)?,
                },
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => tool_results.push(ChatMessage {
                role: "tool".to_string(),
                content: Some(ChatContent::Text(
                    content.map(|c| c.to_string()).unwrap_or_default(),
                )),
                tool_calls: None,
                tool_call_id: Some(tool_use_id),
            }),
            // Reasoning from earlier turns is not replayed upstream
            ContentBlock::Thinking { .. } => {}
            ContentBlock::Unsupported => debug!("Dropping unsupported content block"),
        }
    }

    let mut translated = tool_results;

    if role == "assistant" && !tool_calls.is_empty() {
        let text = joined_text(&parts);
        translated.push(ChatMessage {
            role,
            content: (!text.is_empty()).then(|| ChatContent::Text(text)),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        });
        return Ok(translated);
    }

    // Tool results go first; leftover text or images follow as their own turn
    if translated.is_empty() || !parts.is_empty() {
        translated.push(ChatMessage {
            role,
            content: Some(flatten_parts(parts)),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    Ok(translated)
}

fn joined_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            ContentPart::ImageUrl { .. } => None,
        })
        .collect()
}

/// Text-only content becomes a plain string; anything with images stays a
/// list of typed parts.
fn flatten_parts(parts: Vec<ContentPart>) -> ChatContent {
    if parts.iter().all(|p| matches!(p, ContentPart::Text { .. })) {
        ChatContent::Text(joined_text(&parts))
    } else {
        ChatContent::Parts(parts)
    }
}

fn translate_tools(tools: Vec<Tool>) -> Vec<ChatTool> {
    tools
        .into_iter()
        .map(|tool| ChatTool {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name,
                description: tool.description,
                parameters: tool.input_schema,
            },
        })
        .collect()
}

fn translate_tool_choice(choice: &ToolChoice) -> ChatToolChoice {
    match choice {
        ToolChoice::Auto => ChatToolChoice::Mode("auto".to_string()),
        ToolChoice::Any => ChatToolChoice::Mode("required".to_string()),
        ToolChoice::None => ChatToolChoice::Mode("none".to_string()),
        ToolChoice::Tool { name } => ChatToolChoice::Named(NamedToolChoice {
            choice_type: "function".to_string(),
            function: FunctionName { name: name.clone() },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> MessagesRequest {
        serde_json::from_value(value).unwrap()
    }

    fn translate(value: serde_json::Value) -> ChatCompletionRequest {
        translate_request(request(value), &HashMap::new()).unwrap()
    }

    #[test]
    fn test_simple_message_translation() {
        let translated = translate(json!({
            "model": "meta/llama-3.1-8b-instruct",
            "max_tokens": 100,
            "system": "Be brief.",
            "messages": [{"role": "user", "content": "Hello"}]
        }));

        assert_eq!(translated.model, "meta/llama-3.1-8b-instruct");
        assert_eq!(translated.max_tokens, 100);
        assert!(!translated.stream);
        assert_eq!(
            translated.messages,
            vec![
                ChatMessage::text("system", "Be brief."),
                ChatMessage::text("user", "Hello"),
            ]
        );
    }

    #[test]
    fn test_system_blocks_joined() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1,
            "system": [{"type": "text", "text": "one"}, {"type": "text", "text": "two"}],
            "messages": []
        }));
        assert_eq!(translated.messages[0], ChatMessage::text("system", "one\ntwo"));
    }

    #[test]
    fn test_model_alias_resolved() {
        let mut map = HashMap::new();
        map.insert("claude-sonnet".to_string(), "qwen/qwen3-coder".to_string());
        let translated = translate_request(
            request(json!({"model": "claude-sonnet", "max_tokens": 1, "messages": []})),
            &map,
        )
        .unwrap();
        assert_eq!(translated.model, "qwen/qwen3-coder");
    }

    #[test]
    fn test_invalid_role() {
        let result = translate_request(
            request(json!({"model": "m", "max_tokens": 1, "messages": [{"role": "system", "content": "x"}]})),
            &HashMap::new(),
        );
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
    }

    #[test]
    fn test_text_blocks_flattened_and_thinking_dropped() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1,
            "messages": [{"role": "assistant", "content": [
                {"type": "thinking", "thinking": "secret", "signature": "sig"},
                {"type": "text", "text": "Hello "},
                {"type": "text", "text": "there"}
            ]}]
        }));
        assert_eq!(translated.messages, vec![ChatMessage::text("assistant", "Hello there")]);
    }

    #[test]
    fn test_image_becomes_data_url_part() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1,
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "What is this?"},
                {"type": "image", "source": {"type": "base64", "media_type": "image/jpeg", "data": "AAAA"}}
            ]}]
        }));
        let body = serde_json::to_value(&translated.messages[0]).unwrap();
        assert_eq!(
            body["content"],
            json!([
                {"type": "text", "text": "What is this?"},
                {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,AAAA"}}
            ])
        );
    }

    #[test]
    fn test_assistant_tool_use() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1,
            "messages": [{"role": "assistant", "content": [
                {"type": "tool_use", "id": "t1", "name": "lookup", "input": {"q": "x"}}
            ]}]
        }));
        let body = serde_json::to_value(&translated.messages[0]).unwrap();
        assert_eq!(
            body,
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "t1",
                    "type": "function",
                    "function": {"name": "lookup", "arguments": "{\"q\":\"x\"}"}
                }]
            })
        );
    }

    #[test]
    fn test_tool_results_then_remaining_text() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1,
            "messages": [{"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "t1", "content": "42"},
                {"type": "tool_result", "tool_use_id": "t2", "content": [
                    {"type": "text", "text": "a"},
                    {"type": "text", "text": "b"}
                ]},
                {"type": "text", "text": "thanks"}
            ]}]
        }));

        assert_eq!(translated.messages.len(), 3);
        assert_eq!(translated.messages[0].role, "tool");
        assert_eq!(translated.messages[0].tool_call_id.as_deref(), Some("t1"));
        assert_eq!(translated.messages[0].content, Some(ChatContent::Text("42".to_string())));
        assert_eq!(translated.messages[1].content, Some(ChatContent::Text("a\nb".to_string())));
        assert_eq!(translated.messages[2], ChatMessage::text("user", "thanks"));
    }

    #[test]
    fn test_tool_result_only_emits_no_empty_user_turn() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1,
            "messages": [{"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "t1"}
            ]}]
        }));
        assert_eq!(translated.messages.len(), 1);
        assert_eq!(translated.messages[0].content, Some(ChatContent::Text(String::new())));
    }

    #[test]
    fn test_tools_and_choice() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1, "stream": true,
            "stop_sequences": ["END"],
            "messages": [],
            "tools": [{"name": "lookup", "description": "Find", "input_schema": {"type": "object"}}],
            "tool_choice": {"type": "any"}
        }));
        assert!(translated.stream);
        assert_eq!(translated.stop, Some(vec!["END".to_string()]));
        let body = serde_json::to_value(&translated).unwrap();
        assert_eq!(
            body["tools"],
            json!([{"type": "function", "function": {"name": "lookup", "description": "Find", "parameters": {"type": "object"}}}])
        );
        assert_eq!(body["tool_choice"], json!("required"));

        assert_eq!(
            translate_tool_choice(&ToolChoice::Tool { name: "lookup".to_string() }),
            ChatToolChoice::Named(NamedToolChoice {
                choice_type: "function".to_string(),
                function: FunctionName { name: "lookup".to_string() },
            })
        );
    }

    #[test]
    fn test_tool_choice_dropped_without_tools() {
        let translated = translate(json!({
            "model": "m", "max_tokens": 1, "messages": [],
            "tool_choice": {"type": "auto"}
        }));
        assert!(translated.tools.is_none());
        assert!(translated.tool_choice.is_none());
    }
}
