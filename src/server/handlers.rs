// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::models::anthropic::{ContentBlock, MessageContent, MessagesRequest, ModelInfo, ModelList};
use crate::translation::{transcode, translate_request, translate_response, StreamTranslator};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub upstream: String,
    pub timestamp: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        upstream: state.upstream.base_url().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Lists the configured model aliases.
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelList> {
    let mut aliases: Vec<(&String, &String)> = state.config.upstream.model_map.iter().collect();
    aliases.sort();

    let data: Vec<ModelInfo> = aliases
        .into_iter()
        .map(|(alias, target)| ModelInfo {
            id: alias.clone(),
            model_type: "model".to_string(),
            display_name: target.clone(),
        })
        .collect();

    Json(ModelList {
        first_id: data.first().map(|m| m.id.clone()),
        last_id: data.last().map(|m| m.id.clone()),
        has_more: false,
        data,
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

pub async fn not_found_handler() -> ProxyError {
    ProxyError::NotFound("Not found".to_string())
}

/// Handler for /v1/messages endpoint (Anthropic Messages API compatible)
pub async fn messages_handler(
    State(state): State<AppState>,
    body: String, // Get raw JSON as string first
) -> Response {
    // Manually deserialize to get better error messages
    let request: MessagesRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to deserialize request: {}", e);
            debug!("Raw body (first 1000 chars): {}", body.chars().take(1000).collect::<String>());
            let err = ProxyError::InvalidRequest(format!("JSON deserialization error: {}", e));
            metrics::record_request("/v1/messages", err.status_code().as_u16(), false);
            return err.into_response();
        }
    };

    let streaming = request.stream.unwrap_or(false);
    info!(
        "Received messages request: model={}, messages={}, stream={}",
        request.model,
        request.messages.len(),
        streaming
    );

    let image_count = count_images(&request);
    if image_count > 0 {
        debug!("Request carries {} image block(s)", image_count);
    }

    let result = if streaming {
        stream_messages(&state, request).await
    } else {
        non_stream_messages(&state, request).await
    };

    let response = result.unwrap_or_else(|e| {
        error!("Messages request failed: {}", e);
        e.into_response()
    });
    metrics::record_request("/v1/messages", response.status().as_u16(), streaming);
    response
}

fn count_images(request: &MessagesRequest) -> usize {
    request
        .messages
        .iter()
        .filter_map(|msg| match &msg.content {
            MessageContent::Blocks(blocks) => Some(blocks),
            MessageContent::Text(_) => None,
        })
        .flatten()
        .filter(|block| matches!(block, ContentBlock::Image { .. }))
        .count()
}

async fn non_stream_messages(state: &AppState, request: MessagesRequest) -> Result<Response> {
    let requested_model = request.model.clone();
    let upstream_request = translate_request(request, &state.config.upstream.model_map)?;

    let completion = state.upstream.chat_completions(&upstream_request).await?;
    debug!("Received upstream completion");

    let response = translate_response(completion, &requested_model)?;
    metrics::record_tokens(
        &requested_model,
        response.usage.input_tokens,
        response.usage.output_tokens,
    );

    Ok(Json(response).into_response())
}

async fn stream_messages(state: &AppState, request: MessagesRequest) -> Result<Response> {
    let requested_model = request.model.clone();
    let upstream_request = translate_request(request, &state.config.upstream.model_map)?;

    // Upstream status is known before any event is sent, so failures here
    // are still plain HTTP errors
    let chunks = state
        .upstream
        .stream_chat_completions(&upstream_request)
        .await?;

    debug!("Starting SSE stream for model: {}", requested_model);
    let body = Body::from_stream(transcode(chunks, StreamTranslator::new(requested_model)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|e| ProxyError::Internal(format!("Failed to build SSE response: {}", e)))
}
