// Chat completions API client
// Author: kelexine (https://github.com/kelexine)

use super::sse::chunk_stream;
use crate::config::UpstreamConfig;
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::models::openai::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};
use crate::utils::logging::sanitize;
use futures::Stream;
use reqwest::{Client, Response};
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Parsed upstream chunks of one streaming completion.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// The underlying `reqwest::Client` pools connections, so one instance is
/// shared by every request.
pub struct UpstreamClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created upstream HTTP client for {}", config.api_base_url);

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Get the API base_url
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Call `chat/completions` and return the whole response.
    pub async fn chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        debug!("Calling chat completions for model: {}", request.model);

        let response = self.send(request, false).await?;

        let response_text = response.text().await?;
        debug!(
            "Raw upstream response (first 500 chars): {}",
            response_text.chars().take(500).collect::<String>()
        );

        serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse upstream response: {}", e);
            ProxyError::Translation(format!("Response parsing error: {}", e))
        })
    }

    /// Call `chat/completions` with `stream: true`.
    ///
    /// Fails before any bytes are streamed if the upstream answers non-2xx;
    /// otherwise returns the lazily parsed chunk sequence.
    pub async fn stream_chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChunkStream> {
        debug!("Starting upstream stream for model: {}", request.model);

        let response = self.send(request, true).await?;
        Ok(Box::pin(chunk_stream(response.bytes_stream())))
    }

    async fn send(&self, request: &ChatCompletionRequest, streaming: bool) -> Result<Response> {
        let url = self.endpoint();
        let started = Instant::now();

        let mut builder = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header(
                "Accept",
                if streaming { "text/event-stream" } else { "application/json" },
            )
            .json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            error!("Upstream request to {} failed: {}", url, e);
            metrics::record_upstream_call(0, streaming, started.elapsed().as_secs_f64());
            ProxyError::from(e)
        })?;

        let status = response.status();
        metrics::record_upstream_call(status.as_u16(), streaming, started.elapsed().as_secs_f64());

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Upstream API error: HTTP {} - Response body: {}",
                status,
                sanitize(&error_text)
            );
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = UpstreamConfig {
            api_base_url: "http://localhost:9000/v1/".to_string(),
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
        assert_eq!(client.endpoint(), "http://localhost:9000/v1/chat/completions");
    }
}
