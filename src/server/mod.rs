//! Axum-based HTTP server implementation for the nim2claude bridge.
//!
//! This module is responsible for setting up the HTTP server, configuring routes,
//! and handling incoming requests from clients that expect an Anthropic-compatible API.
//! It bridges these requests to an OpenAI-compatible chat completions API.
//!
//! # Components
//!
//! - `handlers`: Implementation of individual API endpoints (messages, models, health, metrics).
//! - `middleware`: Request ID tracking, client authentication and CORS.
//! - `routes`: The main router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::HealthResponse;
pub use routes::{create_router, AppState};
