pub mod artifact_store;
pub mod pipeline;
pub mod template_service;
pub mod template_source;

pub use artifact_store::{
    ArtifactStore, InMemoryArtifactStore, S3ArtifactStore, StoreError, StoredObject,
};
pub use pipeline::{GenerationPipeline, PipelineError};
pub use template_service::{RenderEngine, RenderError, TeraEngine};
pub use template_source::{FetchError, TemplateFetcher};
