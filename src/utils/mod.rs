//! Utility functions and helpers for the nim2claude bridge.
//!
//! # Submodules
//!
//! - `logging`: Tracing and logging initialization with secret sanitizing.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
