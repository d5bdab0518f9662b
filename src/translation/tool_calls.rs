// Streamed tool call aggregation
// Author: kelexine (https://github.com/kelexine)

use super::blocks::BlockTracker;
use crate::models::anthropic::StopReason;
use crate::models::openai::{FinishReason, ToolCallDelta};
use crate::models::streaming::StreamEvent;
use std::collections::BTreeMap;
use tracing::debug;

/// A tool call whose arguments are still arriving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToolCall {
    pub block_index: u32,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Collects tool call fragments keyed by the upstream positional index.
#[derive(Debug, Clone, Default)]
pub struct ToolCallAggregator {
    calls: BTreeMap<u32, PendingToolCall>,
}

impl ToolCallAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one fragment.
    ///
    /// The first fragment for an index starts a tool_use block. Argument
    /// text is forwarded immediately as `input_json_delta`, in arrival order.
    /// A later non-empty name replaces the stored one. `position` is the
    /// fragment's place in its delta, used when upstream omits `index`.
    pub fn apply(
        &mut self,
        position: usize,
        delta: ToolCallDelta,
        blocks: &mut BlockTracker,
        events: &mut Vec<StreamEvent>,
    ) {
        let ToolCallDelta {
            index,
            id,
            function,
        } = delta;
        let index = index.unwrap_or(position as u32);

        let call = self.calls.entry(index).or_insert_with(|| {
            let id = id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("toolu_{}", uuid::Uuid::new_v4().simple()));
            // The name may only arrive on a later fragment; start with what we have
            let name = function.name.clone().unwrap_or_default();
            debug!("Starting tool call #{}: {} ({})", index, name, id);
            let block_index = blocks.open_tool(index, id.clone(), name.clone(), events);
            PendingToolCall {
                block_index,
                id,
                name,
                arguments: String::new(),
            }
        });

        if let Some(name) = function.name.filter(|n| !n.is_empty()) {
            call.name = name;
        }

        if let Some(arguments) = function.arguments.filter(|a| !a.is_empty()) {
            call.arguments.push_str(&arguments);
            blocks.tool_input_delta(call.block_index, arguments, events);
        }
    }

    pub fn has_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    /// Calls in upstream index order.
    pub fn calls(&self) -> impl Iterator<Item = &PendingToolCall> {
        self.calls.values()
    }

    /// Close every tool_use block in ascending block index order.
    pub fn close_all(&self, blocks: &BlockTracker, events: &mut Vec<StreamEvent>) {
        let mut indices: Vec<u32> = self.calls.values().map(|c| c.block_index).collect();
        indices.sort_unstable();
        for index in indices {
            blocks.close_tool(index, events);
        }
    }
}

/// Derive the Anthropic stop reason.
///
/// Any registered tool call wins over whatever the upstream finish reason
/// says; a length limit maps to `max_tokens`; everything else ends the turn.
pub fn stop_reason(finish_reason: Option<&FinishReason>, had_tool_calls: bool) -> StopReason {
    match finish_reason {
        _ if had_tool_calls => StopReason::ToolUse,
        Some(FinishReason::ToolCalls) => StopReason::ToolUse,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::openai::FunctionDelta;
    use crate::models::streaming::{ContentBlockStart, Delta};

    fn fragment(index: u32, id: Option<&str>, name: Option<&str>, args: Option<&str>) -> ToolCallDelta {
        ToolCallDelta {
            index: Some(index),
            id: id.map(str::to_string),
            function: FunctionDelta {
                name: name.map(str::to_string),
                arguments: args.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut tools = ToolCallAggregator::new();
        let mut blocks = BlockTracker::new();
        let mut events = Vec::new();

        tools.apply(0, fragment(0, Some("t1"), Some("lookup"), Some("{\"q\":")), &mut blocks, &mut events);
        tools.apply(0, fragment(0, None, None, Some("\"x\"}")), &mut blocks, &mut events);

        let call = tools.calls().next().unwrap();
        assert_eq!(call.arguments, "{\"q\":\"x\"}");
        assert!(serde_json::from_str::<serde_json::Value>(&call.arguments).is_ok());

        assert_eq!(
            events[0],
            StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ContentBlockStart::tool_use("t1".to_string(), "lookup".to_string()),
            }
        );
        let partials: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ContentBlockDelta { delta: Delta::InputJsonDelta { partial_json }, .. } => {
                    Some(partial_json.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(partials, vec!["{\"q\":", "\"x\"}"]);
    }

    #[test]
    fn test_late_name_overwrites_and_missing_id_is_generated() {
        let mut tools = ToolCallAggregator::new();
        let mut blocks = BlockTracker::new();
        let mut events = Vec::new();

        tools.apply(0, fragment(0, None, None, Some("{}")), &mut blocks, &mut events);
        tools.apply(0, fragment(0, None, Some("search"), None), &mut blocks, &mut events);

        let call = tools.calls().next().unwrap();
        assert_eq!(call.name, "search");
        assert!(call.id.starts_with("toolu_"));
        // block was started before the name was known
        assert!(matches!(
            &events[0],
            StreamEvent::ContentBlockStart { content_block: ContentBlockStart::ToolUse { name, .. }, .. } if name.is_empty()
        ));
    }

    #[test]
    fn test_close_all_ascending() {
        let mut tools = ToolCallAggregator::new();
        let mut blocks = BlockTracker::new();
        let mut events = Vec::new();

        tools.apply(0, fragment(1, Some("b"), Some("two"), None), &mut blocks, &mut events);
        tools.apply(0, fragment(0, Some("a"), Some("one"), None), &mut blocks, &mut events);

        let mut closing = Vec::new();
        tools.close_all(&blocks, &mut closing);
        assert_eq!(
            closing,
            vec![
                StreamEvent::ContentBlockStop { index: 0 },
                StreamEvent::ContentBlockStop { index: 1 },
            ]
        );
    }

    #[test]
    fn test_missing_index_falls_back_to_position() {
        let mut tools = ToolCallAggregator::new();
        let mut blocks = BlockTracker::new();
        let mut events = Vec::new();

        let unindexed = |id: &str, args: &str| ToolCallDelta {
            index: None,
            id: Some(id.to_string()),
            function: FunctionDelta {
                name: Some("f".to_string()),
                arguments: Some(args.to_string()),
            },
        };
        tools.apply(0, unindexed("a", "{\"x\":1}"), &mut blocks, &mut events);
        tools.apply(1, unindexed("b", "{\"y\":2}"), &mut blocks, &mut events);

        let calls: Vec<_> = tools.calls().map(|c| (c.id.as_str(), c.arguments.as_str())).collect();
        assert_eq!(calls, vec![("a", "{\"x\":1}"), ("b", "{\"y\":2}")]);
    }

    #[test]
    fn test_stop_reason_derivation() {
        assert_eq!(stop_reason(Some(&FinishReason::Stop), false), StopReason::EndTurn);
        assert_eq!(stop_reason(None, false), StopReason::EndTurn);
        assert_eq!(stop_reason(Some(&FinishReason::Length), false), StopReason::MaxTokens);
        assert_eq!(stop_reason(Some(&FinishReason::ToolCalls), false), StopReason::ToolUse);
        assert_eq!(stop_reason(Some(&FinishReason::Stop), true), StopReason::ToolUse);
        assert_eq!(stop_reason(Some(&FinishReason::Length), true), StopReason::ToolUse);
    }
}
