// nim2claude - Anthropic Messages API proxy for OpenAI-compatible chat completions
// Author: kelexine (https://github.com/kelexine)

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod server;
pub mod translation;
pub mod upstream;
pub mod utils;
