// Response translation (chat completions → Anthropic)
// Author: kelexine (https://github.com/kelexine)

use super::think_tags::{Channel, ThinkSplitter};
use super::tool_calls::stop_reason;
use crate::error::{ProxyError, Result};
use crate::models::anthropic::{ContentBlock, MessagesResponse, Usage};
use crate::models::openai::{ChatCompletionResponse, ChatToolCall};
use serde_json::Value;
use tracing::debug;

/// Translate a complete chat completion into an Anthropic message.
///
/// `model` is the name the client asked for, echoed back unchanged.
pub fn translate_response(response: ChatCompletionResponse, model: &str) -> Result<MessagesResponse> {
    debug!("Translating chat completion to Anthropic format");

    let id = response
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("msg_{}", uuid::Uuid::new_v4().simple()));

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProxyError::Translation("No choices in upstream response".to_string()))?;

    debug!("Response finish_reason: {:?}", choice.finish_reason);

    let message = choice.message;
    let mut thinking = message.reasoning_content.unwrap_or_default();
    let mut text = String::new();

    if let Some(content) = message.content {
        let mut splitter = ThinkSplitter::default();
        let segments = splitter.push(&content).into_iter().chain(splitter.flush());
        for (channel, segment) in segments {
            match channel {
                Channel::Thinking => thinking.push_str(&segment),
                Channel::Visible => text.push_str(&segment),
            }
        }
    }

    let had_tool_calls = !message.tool_calls.is_empty();
    let tool_uses = message
        .tool_calls
        .into_iter()
        .map(translate_tool_call)
        .collect::<Result<Vec<_>>>()?;

    let mut content = Vec::with_capacity(tool_uses.len() + 2);
    if !thinking.is_empty() {
        content.push(ContentBlock::Thinking {
            thinking,
            signature: None,
        });
    }
    if !text.is_empty() {
        content.push(ContentBlock::text(text));
    }
    content.extend(tool_uses);
    if content.is_empty() {
        content.push(ContentBlock::text(""));
    }

    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    debug!(
        "Translated response: {} content blocks, usage: {:?}",
        content.len(),
        usage
    );

    let mut translated = MessagesResponse::new(
        id,
        model.to_string(),
        content,
        usage,
    );
    translated.stop_reason = Some(stop_reason(choice.finish_reason.as_ref(), had_tool_calls));
    Ok(translated)
}

/// Translate one complete tool call; `arguments` must hold a JSON document.
fn translate_tool_call(call: ChatToolCall) -> Result<ContentBlock> {
    debug!("Translating tool call: {}", call.function.name);

    let input = if call.function.arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(&call.function.arguments).map_err(|e| {
            ProxyError::Translation(format!(
                "Invalid arguments for tool call {}: {}",
                call.function.name, e
            ))
        })?
    };

    let id = if call.id.is_empty() {
        format!("toolu_{}", uuid::Uuid::new_v4().simple())
    } else {
        call.id
    };

    Ok(ContentBlock::ToolUse {
        id,
        name: call.function.name,
        input,
    })
}
