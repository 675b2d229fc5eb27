//! Template acquisition: inline payloads and remote template URLs.

use std::time::Duration;

use crate::models::TemplateSource;

/// Error type for template acquisition
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Template URL unreachable: {0}")]
    Unreachable(String),

    #[error("Template server responded with status {0}")]
    Status(u16),

    #[error("Template exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Obtains raw template bytes from the request's template source
pub struct TemplateFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl TemplateFetcher {
    /// Create a fetcher with a total request timeout and a size cap for remote templates
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rengendoc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, max_bytes })
    }

    /// Return the template bytes, fetching them if the source is a URL
    pub async fn acquire(&self, source: &TemplateSource) -> Result<Vec<u8>, FetchError> {
        match source {
            TemplateSource::Inline { data } => Ok(data.clone()),
            TemplateSource::Url { url } => self.fetch(url).await,
        }
    }

    /// Single GET of a remote template, capped at `max_bytes`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %url, "Fetching template");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Template fetch rejected");
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                return Err(FetchError::TooLarge {
                    max: self.max_bytes,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Unreachable(describe(&e)))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    max: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, bytes = body.len(), "Template fetched");
        Ok(body)
    }
}

/// Transport error summary without the request URL's query string or credentials
fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else if e.is_redirect() {
        "too many redirects".to_string()
    } else if e.is_builder() {
        "invalid url".to_string()
    } else {
        "transport error".to_string()
    }
}
