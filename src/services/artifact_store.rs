//! Persistence of rendered documents in object storage.

use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::{ConfigError, KeyStrategy, StorageConfig};

/// Length of randomly generated object keys
const RANDOM_KEY_LEN: usize = 24;

/// Error type for artifact storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to upload object: {0}")]
    Upload(String),

    #[error("Failed to make object public: {0}")]
    Acl(String),
}

/// An artifact after upload; the bucket owns it from here on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
}

/// Trait for artifact storage backends
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Store bytes as a new publicly readable object and return its key
    async fn put(&self, bytes: Vec<u8>) -> Result<StoredObject, StoreError>;
}

/// Compute the object key for `bytes` under the given strategy
pub fn object_key(strategy: KeyStrategy, bytes: &[u8]) -> String {
    match strategy {
        KeyStrategy::ContentHash => hex::encode(Sha256::digest(bytes)),
        KeyStrategy::Random => rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(RANDOM_KEY_LEN)
            .map(char::from)
            .collect(),
    }
}

/// S3-compatible artifact store
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    key_strategy: KeyStrategy,
}

impl S3ArtifactStore {
    /// Build a client bound to the configured bucket.
    ///
    /// Retries are disabled: every storage call is attempted exactly once.
    pub fn new(storage: &StorageConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let endpoint = storage
            .endpoint_url()
            .ok_or(ConfigError::Missing("S3_PROXY_URL"))?;
        let access_key = storage
            .access_key
            .clone()
            .ok_or(ConfigError::Missing("S3_ACCESS_KEY"))?;
        let secret_key = storage
            .secret_key
            .clone()
            .ok_or(ConfigError::Missing("S3_SECRET_KEY"))?;

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(storage.region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "rengendoc-static",
            ))
            .force_path_style(true)
            .retry_config(RetryConfig::disabled())
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .build();

        tracing::info!(
            endpoint = %endpoint,
            bucket = %storage.bucket_name,
            key_strategy = ?storage.key_strategy,
            "S3 artifact store configured"
        );

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket: storage.bucket_name.clone(),
            key_strategy: storage.key_strategy,
        })
    }

    /// Best-effort removal of an object whose ACL could not be set
    async fn discard(&self, key: &str) {
        if let Err(e) = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            tracing::warn!(
                key = %key,
                error = %DisplayErrorContext(&e),
                "Failed to remove private object after ACL failure"
            );
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<StoredObject, StoreError> {
        let key = object_key(self.key_strategy, &bytes);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %DisplayErrorContext(&e), "PutObject failed");
                StoreError::Upload(e.to_string())
            })?;

        if let Err(e) = self
            .client
            .put_object_acl()
            .bucket(&self.bucket)
            .key(&key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
        {
            tracing::error!(key = %key, error = %DisplayErrorContext(&e), "PutObjectAcl failed");
            self.discard(&key).await;
            return Err(StoreError::Acl(e.to_string()));
        }

        tracing::debug!(key = %key, bytes = size, bucket = %self.bucket, "Object stored");
        Ok(StoredObject { key })
    }
}

/// In-memory artifact storage
pub struct InMemoryArtifactStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    key_strategy: KeyStrategy,
}

impl InMemoryArtifactStore {
    pub fn new(key_strategy: KeyStrategy) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            key_strategy,
        }
    }

    /// Retrieve a stored object
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.read().await;
        objects.get(key).cloned()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self::new(KeyStrategy::ContentHash)
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, bytes: Vec<u8>) -> Result<StoredObject, StoreError> {
        let key = object_key(self.key_strategy, &bytes);
        let mut objects = self.objects.write().await;
        objects.insert(key.clone(), bytes);
        Ok(StoredObject { key })
    }
}
