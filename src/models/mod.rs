pub mod config;
pub mod request;

pub use config::{AppConfig, ConfigError, KeyStrategy, StorageBackend, StorageConfig};
pub use request::{
    GenerationRequest, GenerationResponse, RawGenerationRequest, RequestError, TemplateSource,
};
