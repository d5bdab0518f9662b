// Content block lifecycle for outgoing SSE streams
// Author: kelexine (https://github.com/kelexine)

use crate::models::streaming::{ContentBlockStart, Delta, StreamEvent};
use std::collections::BTreeSet;

/// The thinking or text block currently receiving deltas, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveBlock {
    None,
    Thinking { index: u32 },
    Text { index: u32 },
}

/// Opens, feeds and closes content blocks, handing out block indices.
///
/// Invariants:
/// - a delta is only ever emitted for a block that has been started,
/// - at most one thinking/text block is open at a time,
/// - no index is handed out twice.
///
/// Tool blocks are placed at `tool_base + upstream index`, where `tool_base`
/// is fixed the first time any tool block opens.
#[derive(Debug, Clone)]
pub struct BlockTracker {
    next_index: u32,
    active: ActiveBlock,
    tool_base: Option<u32>,
    assigned: BTreeSet<u32>,
}

impl Default for BlockTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTracker {
    pub fn new() -> Self {
        Self {
            next_index: 0,
            active: ActiveBlock::None,
            tool_base: None,
            assigned: BTreeSet::new(),
        }
    }

    pub fn active(&self) -> ActiveBlock {
        self.active
    }

    /// Number of blocks started so far.
    pub fn started(&self) -> usize {
        self.assigned.len()
    }

    /// Emit thinking text, opening a thinking block first if needed.
    pub fn thinking_delta(&mut self, thinking: String, events: &mut Vec<StreamEvent>) {
        if thinking.is_empty() {
            return;
        }
        let index = match self.active {
            ActiveBlock::Thinking { index } => index,
            _ => {
                self.close_active(events);
                let index = self.allocate();
                events.push(StreamEvent::ContentBlockStart {
                    index,
                    content_block: ContentBlockStart::thinking(),
                });
                self.active = ActiveBlock::Thinking { index };
                index
            }
        };
        events.push(StreamEvent::ContentBlockDelta {
            index,
            delta: Delta::ThinkingDelta { thinking },
        });
    }

    /// Emit visible text, closing a thinking block and opening a text block
    /// first if needed.
    pub fn text_delta(&mut self, text: String, events: &mut Vec<StreamEvent>) {
        if text.is_empty() {
            return;
        }
        let index = match self.active {
            ActiveBlock::Text { index } => index,
            _ => {
                self.close_active(events);
                let index = self.allocate();
                events.push(StreamEvent::ContentBlockStart {
                    index,
                    content_block: ContentBlockStart::text(),
                });
                self.active = ActiveBlock::Text { index };
                index
            }
        };
        events.push(StreamEvent::ContentBlockDelta {
            index,
            delta: Delta::TextDelta { text },
        });
    }

    /// Close the open thinking/text block, if any.
    pub fn close_active(&mut self, events: &mut Vec<StreamEvent>) {
        match std::mem::replace(&mut self.active, ActiveBlock::None) {
            ActiveBlock::Thinking { index } | ActiveBlock::Text { index } => {
                events.push(StreamEvent::ContentBlockStop { index });
            }
            ActiveBlock::None => {}
        }
    }

    /// Start a tool_use block for the given upstream tool call position and
    /// return its block index. Closes the open thinking/text block.
    pub fn open_tool(
        &mut self,
        upstream_index: u32,
        id: String,
        name: String,
        events: &mut Vec<StreamEvent>,
    ) -> u32 {
        self.close_active(events);

        let base = *self.tool_base.get_or_insert(self.next_index);
        let preferred = base.saturating_add(upstream_index);
        let index = if self.assigned.contains(&preferred) {
            // A text block took the slot after tools began; move past it
            self.next_index
        } else {
            preferred
        };
        self.reserve(index);

        events.push(StreamEvent::ContentBlockStart {
            index,
            content_block: ContentBlockStart::tool_use(id, name),
        });
        index
    }

    /// Forward one raw argument fragment of a tool_use block.
    pub fn tool_input_delta(&self, index: u32, partial_json: String, events: &mut Vec<StreamEvent>) {
        events.push(StreamEvent::ContentBlockDelta {
            index,
            delta: Delta::InputJsonDelta { partial_json },
        });
    }

    pub fn close_tool(&self, index: u32, events: &mut Vec<StreamEvent>) {
        events.push(StreamEvent::ContentBlockStop { index });
    }

    fn allocate(&mut self) -> u32 {
        let index = self.next_index;
        self.reserve(index);
        index
    }

    fn reserve(&mut self, index: u32) {
        self.assigned.insert(index);
        self.next_index = self.next_index.max(index.saturating_add(1));
    }
}
