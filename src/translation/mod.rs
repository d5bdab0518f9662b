// Translation module - Anthropic ↔ chat completions translation
// Author: kelexine (https://github.com/kelexine)

pub mod blocks;
pub mod request;
pub mod response;
pub mod streaming;
pub mod think_tags;
pub mod tool_calls;

pub use request::translate_request;
pub use response::translate_response;
pub use streaming::{transcode, StreamTranslator};
pub use think_tags::{Channel, ThinkSplitter};
