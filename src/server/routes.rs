// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    health_handler, messages_handler, metrics_handler, models_handler, not_found_handler,
};
use super::middleware::{cors_layer, request_id_layers, require_api_key};
use crate::config::AppConfig;
use crate::error::Result;
use crate::upstream::UpstreamClient;
use axum::extract::DefaultBodyLimit;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub upstream: Arc<UpstreamClient>,
}

pub fn create_router(config: AppConfig, upstream: UpstreamClient) -> Result<Router> {
    let max_body_bytes = config.server.max_body_bytes;
    let cors_enabled = config.server.cors_enabled;
    let state = AppState {
        config: Arc::new(config),
        upstream: Arc::new(upstream),
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/models", get(models_handler))
        .route("/v1/messages", post(messages_handler))
        .fallback(not_found_handler)
        .layer(from_fn_with_state(state.clone(), require_api_key))
        // Base64 images make bodies large; the explicit limit replaces axum's 2 MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id);

    // Outermost, so preflights are answered before auth runs
    let app = if cors_enabled {
        app.layer(cors_layer())
    } else {
        app
    };

    Ok(app.with_state(state))
}
