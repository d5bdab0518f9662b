// Error types for nim2claude proxy
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream API error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ProxyError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Anthropic error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProxyError::Authentication(_) => "authentication_error",
            ProxyError::InvalidRequest(_) => "invalid_request_error",
            ProxyError::NotFound(_) => "not_found_error",
            ProxyError::Translation(_) => "translation_error",
            ProxyError::Config(_) | ProxyError::ConfigParsing(_) => "configuration_error",
            _ => "api_error",
        }
    }
}

// Convert ProxyError to HTTP responses for Axum
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        // The upstream body is forwarded verbatim, like the client would see it
        // when talking to the upstream directly.
        let message = match self {
            ProxyError::Upstream { message, .. } => message,
            ProxyError::Authentication(message) | ProxyError::NotFound(message) => message,
            other => other.to_string(),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
