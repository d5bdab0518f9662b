//! Structured logging and security-focused trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! sensitive data (like API keys) from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{ProxyError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports three output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `compact`: Single-line human-readable output.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ProxyError::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| ProxyError::Internal(format!("Failed to install logger: {}", e)))
}

/// Sanitizes sensitive information from log messages.
///
/// Replaces NVIDIA API keys (`nvapi-...`) and the credential following any
/// `Bearer ` with a `[REDACTED]` placeholder, so upstream error bodies and
/// echoed headers can be logged safely.
pub fn sanitize(input: &str) -> String {
    let mut result = input.to_string();

    for (marker, replacement, keep_marker) in [
        ("nvapi-", "[REDACTED_API_KEY]", false),
        ("Bearer ", "[REDACTED]", true),
    ] {
        let mut search_from = 0;
        while let Some(pos) = result[search_from..].find(marker) {
            let start = search_from + pos;
            let secret_start = if keep_marker { start + marker.len() } else { start };
            // Search for the end of the token (delimiter or end of string)
            let end = result[secret_start..]
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ',')
                .map(|i| secret_start + i)
                .unwrap_or(result.len());
            if end == secret_start {
                search_from = secret_start;
                continue;
            }
            result.replace_range(secret_start..end, replacement);
            search_from = secret_start + replacement.len();
        }
    }

    result
}
