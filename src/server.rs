//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::error::ApiError;
use crate::models::{AppConfig, ConfigError, GenerationResponse, StorageBackend};
use crate::services::{
    ArtifactStore, GenerationPipeline, InMemoryArtifactStore, S3ArtifactStore, TemplateFetcher,
    TeraEngine,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<GenerationPipeline>,
}

/// Create application state, binding the storage backend named in the config.
pub fn create_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn ArtifactStore> = match config.storage.backend {
        StorageBackend::S3 => Arc::new(S3ArtifactStore::new(
            &config.storage,
            Duration::from_secs(config.storage_timeout_secs),
        )?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; generated documents are not persisted");
            Arc::new(InMemoryArtifactStore::new(config.storage.key_strategy))
        }
    };

    create_app_state_with_store(config, store)
}

/// Create application state around an already constructed artifact store.
pub fn create_app_state_with_store(
    config: AppConfig,
    store: Arc<dyn ArtifactStore>,
) -> anyhow::Result<AppState> {
    let public_base_url = config
        .storage
        .public_base_url
        .clone()
        .ok_or(ConfigError::Missing("S3_PUBLIC_URL"))?;

    let fetcher = TemplateFetcher::new(
        Duration::from_secs(config.fetch_timeout_secs),
        config.max_template_bytes,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create template fetcher: {e}"))?;

    let pipeline = Arc::new(GenerationPipeline::new(
        fetcher,
        Arc::new(TeraEngine::new()),
        store,
        public_base_url,
    ));

    Ok(AppState {
        config: Arc::new(config),
        pipeline,
    })
}

/// Build the API router with all endpoints and middleware.
///
/// This is the core router used by both production and tests.
/// JSON negotiation runs on `/v1` before the handler reads the body.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1",
            post(handle_generate).route_layer(middleware::from_fn(api::require_json)),
        )
        // Health check
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// Wrapper handler to extract state components for the underlying API handler

async fn handle_generate(
    axum::extract::State(state): axum::extract::State<AppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Body,
) -> Result<axum::Json<GenerationResponse>, ApiError> {
    api::handle_generate(
        axum::extract::State(state.pipeline),
        axum::extract::State(state.config),
        headers,
        body,
    )
    .await
}
