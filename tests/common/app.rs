//! Test application factory for integration tests.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use rengendoc::models::{AppConfig, StorageBackend};
use rengendoc::server::{build_router, create_app_state_with_store};
use rengendoc::services::{
    ArtifactStore, InMemoryArtifactStore, StoreError, StoredObject,
};

use super::fixtures::PUBLIC_BASE_URL;

/// Test application with router and direct access to the artifact store
pub struct TestApp {
    router: axum::Router,
    pub store: Arc<InMemoryArtifactStore>,
}

impl TestApp {
    /// Create a new test application backed by in-memory storage
    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    /// Default test configuration
    pub fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.public_base_url = Some(PUBLIC_BASE_URL.to_string());
        config.fetch_timeout_secs = 5;
        config
    }

    /// Create a test application with a custom configuration
    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryArtifactStore::new(config.storage.key_strategy));
        let state = create_app_state_with_store(config, store.clone())
            .expect("Failed to create app state");

        // Build router using shared server module (same as production)
        let router = build_router(state);

        Self { router, store }
    }

    /// Create a router whose storage always fails
    pub fn with_failing_store() -> axum::Router {
        let state = create_app_state_with_store(Self::config(), Arc::new(FailingStore))
            .expect("Failed to create app state");
        build_router(state)
    }

    /// Make a GET request to the given path
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// POST a JSON body to /v1 with JSON Accept and Content-Type headers
    pub async fn generate(&self, body: &str) -> TestResponse {
        self.post(
            "/v1",
            &[
                ("Accept", "application/json"),
                ("Content-Type", "application/json"),
            ],
            body,
        )
        .await
    }

    /// Make a POST request with exactly the given headers
    pub async fn post(&self, path: &str, headers: &[(&str, &str)], body: &str) -> TestResponse {
        let mut builder = Request::post(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Send a request to the router
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        send(&self.router, request).await
    }

    /// Look up the stored object behind a download URL
    pub async fn fetch_download(&self, download_url: &str) -> Option<Vec<u8>> {
        let key = download_url.strip_prefix(PUBLIC_BASE_URL)?;
        self.store.get(key).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Send a request through any router and collect the response
pub async fn send(router: &axum::Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Request failed");

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect body")
        .to_bytes()
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Artifact store that rejects every upload
pub struct FailingStore;

#[async_trait]
impl ArtifactStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn put(&self, _bytes: Vec<u8>) -> Result<StoredObject, StoreError> {
        Err(StoreError::Upload(
            "access denied for key AKIAEXAMPLE".to_string(),
        ))
    }
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}
