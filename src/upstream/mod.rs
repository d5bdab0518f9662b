// Upstream chat completions API
// Author: kelexine (https://github.com/kelexine)

mod client;
pub mod sse;

pub use client::{ChunkStream, UpstreamClient};
pub use sse::{chunk_stream, FrameReader};
