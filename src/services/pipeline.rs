use std::sync::Arc;

use crate::models::{GenerationRequest, GenerationResponse};
use crate::services::{
    ArtifactStore, FetchError, RenderEngine, RenderError, StoreError, TemplateFetcher,
};

/// Error from the generation pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Template fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Template error: {0}")]
    Render(#[from] RenderError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Generation pipeline that orchestrates acquire → render → store
pub struct GenerationPipeline {
    fetcher: TemplateFetcher,
    engine: Arc<dyn RenderEngine>,
    store: Arc<dyn ArtifactStore>,
    public_base_url: String,
}

impl GenerationPipeline {
    pub fn new(
        fetcher: TemplateFetcher,
        engine: Arc<dyn RenderEngine>,
        store: Arc<dyn ArtifactStore>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            engine,
            store,
            public_base_url: public_base_url.into(),
        }
    }

    /// Generate a document and return where it can be downloaded
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, PipelineError> {
        let source_kind = request.template.kind();
        let template = self.fetcher.acquire(&request.template).await?;

        tracing::debug!(
            source = source_kind,
            template_len = template.len(),
            "Template acquired"
        );

        let rendered = self.render_in_blocking_context(template, request).await?;

        tracing::debug!(rendered_len = rendered.len(), "Template rendered successfully");

        let size = rendered.len();
        let stored = self.store.put(rendered).await?;
        let download_url = public_url(&self.public_base_url, &stored.key);

        tracing::info!(
            key = %stored.key,
            bytes = size,
            source = source_kind,
            store = self.store.name(),
            "Document generated"
        );

        Ok(GenerationResponse { download_url })
    }

    /// Execute CPU-bound rendering off the async runtime
    async fn render_in_blocking_context(
        &self,
        template: Vec<u8>,
        request: GenerationRequest,
    ) -> Result<Vec<u8>, RenderError> {
        let engine = self.engine.clone();

        tokio::task::spawn_blocking(move || engine.render(&template, &request.context))
            .await
            .map_err(|e| RenderError::Engine(format!("Render task failed: {e}")))?
    }
}

/// Join the public base URL and an object key with exactly one slash
pub fn public_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}
