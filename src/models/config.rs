use serde::Deserialize;
use std::path::Path;

/// Default ceiling for request bodies and fetched templates (3 MiB)
pub const DEFAULT_MAX_BYTES: usize = 3 * 1024 * 1024;

/// Application configuration, loaded from an optional YAML file and the environment
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Maximum size of a template fetched by URL
    pub max_template_bytes: usize,

    /// Total timeout for a template fetch, in seconds
    pub fetch_timeout_secs: u64,

    /// Timeout for a single storage operation, in seconds
    pub storage_timeout_secs: u64,

    /// Object storage settings
    pub storage: StorageConfig,
}

/// Which artifact store implementation backs the service
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// How object keys are assigned to stored artifacts
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// Hex SHA-256 of the artifact bytes
    #[default]
    ContentHash,
    /// Random alphanumeric key
    Random,
}

impl std::str::FromStr for KeyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "content-hash" | "hash" => Ok(Self::ContentHash),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown key strategy: {other}")),
        }
    }
}

/// S3-compatible storage settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Storage host (or proxy host); may carry its own scheme and port
    pub endpoint: Option<String>,

    pub port: u16,

    /// Use https when the endpoint has no explicit scheme
    pub secure: bool,

    pub access_key: Option<String>,

    pub secret_key: Option<String>,

    pub region: String,

    pub bucket_name: String,

    /// Prefix for download URLs handed back to callers
    pub public_base_url: Option<String>,

    pub key_strategy: KeyStrategy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: None,
            port: 80,
            secure: false,
            access_key: None,
            secret_key: None,
            region: "us-east-1".to_string(),
            bucket_name: "my_bucket".to_string(),
            public_base_url: None,
            key_strategy: KeyStrategy::ContentHash,
        }
    }
}

impl StorageConfig {
    /// Full endpoint URL for the S3 client
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?.trim_end_matches('/');
        if endpoint.contains("://") {
            return Some(endpoint.to_string());
        }
        let scheme = if self.secure { "https" } else { "http" };
        Some(format!("{scheme}://{endpoint}:{}", self.port))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3002".to_string(),
            max_body_bytes: DEFAULT_MAX_BYTES,
            max_template_bytes: DEFAULT_MAX_BYTES,
            fetch_timeout_secs: 30,
            storage_timeout_secs: 30,
            storage: StorageConfig::default(),
        }
    }
}

/// Configuration problems detected at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl AppConfig {
    /// Load configuration from an optional YAML file; a missing path means defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Apply overrides from environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("MAX_UPLOAD_TEMPLATE_SIZE") {
            self.max_body_bytes = parse_var("MAX_UPLOAD_TEMPLATE_SIZE", &v)?;
        }
        if let Some(v) = get("MAX_TEMPLATE_FETCH_SIZE") {
            self.max_template_bytes = parse_var("MAX_TEMPLATE_FETCH_SIZE", &v)?;
        }
        if let Some(v) = get("TEMPLATE_FETCH_TIMEOUT") {
            self.fetch_timeout_secs = parse_var("TEMPLATE_FETCH_TIMEOUT", &v)?;
        }
        if let Some(v) = get("STORAGE_TIMEOUT") {
            self.storage_timeout_secs = parse_var("STORAGE_TIMEOUT", &v)?;
        }

        let storage = &mut self.storage;
        if let Some(v) = get("STORAGE_BACKEND") {
            storage.backend = parse_var("STORAGE_BACKEND", &v)?;
        }
        if let Some(v) = get("STORAGE_KEY_STRATEGY") {
            storage.key_strategy = parse_var("STORAGE_KEY_STRATEGY", &v)?;
        }
        if let Some(v) = get("S3_PROXY_URL") {
            storage.endpoint = Some(v);
        }
        if let Some(v) = get("S3_PROXY_PORT") {
            storage.port = parse_var("S3_PROXY_PORT", &v)?;
        }
        if let Some(v) = get("S3_ACCESS_KEY") {
            storage.access_key = Some(v);
        }
        if let Some(v) = get("S3_SECRET_KEY") {
            storage.secret_key = Some(v);
        }
        if let Some(v) = get("S3_REGION") {
            storage.region = v;
        }
        if let Some(v) = get("S3_BUCKET_NAME") {
            storage.bucket_name = v;
        }
        if let Some(v) = get("S3_PUBLIC_URL") {
            storage.public_base_url = Some(v);
        }

        Ok(())
    }

    /// Check that the configuration can actually serve requests
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Zero("max_body_bytes"));
        }
        if self.max_template_bytes == 0 {
            return Err(ConfigError::Zero("max_template_bytes"));
        }
        if self.storage.public_base_url.is_none() {
            return Err(ConfigError::Missing("S3_PUBLIC_URL"));
        }
        if self.storage.backend == StorageBackend::S3 {
            if self.storage.endpoint.is_none() {
                return Err(ConfigError::Missing("S3_PROXY_URL"));
            }
            if self.storage.access_key.is_none() {
                return Err(ConfigError::Missing("S3_ACCESS_KEY"));
            }
            if self.storage.secret_key.is_none() {
                return Err(ConfigError::Missing("S3_SECRET_KEY"));
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}
