//! Configuration data structures for the nim2claude bridge.
//!
//! This module defines the schema for the application settings: the HTTP
//! server, the upstream chat completions endpoint, client authentication and
//! logging.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, CORS).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream chat completions API settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Client authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to answer CORS preflights and attach CORS headers.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Maximum accepted request body size in bytes.
    /// Default: 50 MiB (base64 images are large)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Settings for the upstream OpenAI-compatible API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL; `/chat/completions` is appended.
    /// Default: NVIDIA NIM integrate API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token sent upstream. Empty means no Authorization header.
    #[serde(default)]
    pub api_key: String,

    /// Whole-request timeout in seconds.
    /// Default: `300` (5 minutes)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// TCP connect timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Client model name -> upstream model name. Unknown names pass through.
    #[serde(default)]
    pub model_map: HashMap<String, String>,
}

/// Settings for authenticating downstream clients.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared secret clients must present via `x-api-key` or
    /// `Authorization: Bearer`. `None` disables the check.
    #[serde(default)]
    pub token: Option<String>,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: String::new(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            model_map: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_api_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
