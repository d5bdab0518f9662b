// Incremental <think> tag splitter
// Author: kelexine (https://github.com/kelexine)

/// Opening sentinel of an inline reasoning span.
pub const THINK_OPEN: &str = "<think>";
/// Closing sentinel of an inline reasoning span.
pub const THINK_CLOSE: &str = "</think>";

/// Which sub-channel a piece of text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Thinking,
    Visible,
}

/// Splits one text stream into thinking and visible text.
///
/// Tags may be split across any number of fragments. Only a suffix that is
/// still a proper prefix of the awaited tag is held back, so the buffer never
/// retains more than `tag.len() - 1` bytes between calls.
#[derive(Debug, Clone)]
pub struct ThinkSplitter {
    open_tag: &'static str,
    close_tag: &'static str,
    buffer: String,
    in_thinking: bool,
}

impl Default for ThinkSplitter {
    fn default() -> Self {
        Self::new(THINK_OPEN, THINK_CLOSE)
    }
}

impl ThinkSplitter {
    pub fn new(open_tag: &'static str, close_tag: &'static str) -> Self {
        Self {
            open_tag,
            close_tag,
            buffer: String::new(),
            in_thinking: false,
        }
    }

    /// Feed one fragment, returning the segments that are now certain.
    /// Segments are never empty.
    pub fn push(&mut self, fragment: &str) -> Vec<(Channel, String)> {
        let mut segments = Vec::new();
        self.buffer.push_str(fragment);

        loop {
            let (tag, channel) = self.awaited();
            match self.buffer.find(tag) {
                Some(idx) => {
                    // Found the tag: everything before it is settled
                    let rest = self.buffer.split_off(idx + tag.len());
                    self.buffer.truncate(idx);
                    let settled = std::mem::replace(&mut self.buffer, rest);
                    Self::emit(&mut segments, channel, settled);
                    self.in_thinking = !self.in_thinking;
                }
                None => {
                    // Hold back a possible partial tag at the end
                    let keep_from = Self::find_partial_tag(&self.buffer, tag)
                        .unwrap_or(self.buffer.len());
                    let kept = self.buffer.split_off(keep_from);
                    let settled = std::mem::replace(&mut self.buffer, kept);
                    Self::emit(&mut segments, channel, settled);
                    break;
                }
            }
        }

        segments
    }

    /// Flush whatever is held back to the active channel. An unterminated
    /// span is not an error; its remainder is thinking.
    pub fn flush(&mut self) -> Option<(Channel, String)> {
        let (_, channel) = self.awaited();
        let rest = std::mem::take(&mut self.buffer);
        (!rest.is_empty()).then_some((channel, rest))
    }

    /// Whether the splitter is currently inside a thinking span.
    pub fn in_thinking(&self) -> bool {
        self.in_thinking
    }

    /// Number of bytes held back awaiting more input.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// The tag that would change state, and the channel text goes to meanwhile.
    fn awaited(&self) -> (&'static str, Channel) {
        if self.in_thinking {
            (self.close_tag, Channel::Thinking)
        } else {
            (self.open_tag, Channel::Visible)
        }
    }

    fn emit(segments: &mut Vec<(Channel, String)>, channel: Channel, text: String) {
        if !text.is_empty() {
            segments.push((channel, text));
        }
    }

    /// Find partial tag match at end of string.
    /// Returns index where the longest matching proper prefix starts.
    fn find_partial_tag(text: &str, tag: &str) -> Option<usize> {
        (1..tag.len())
            .rev()
            .filter(|&i| tag.is_char_boundary(i))
            .find(|&i| text.ends_with(&tag[..i]))
            .map(|i| text.len() - i)
    }
}
