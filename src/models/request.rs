//! Wire types for the document generation endpoint.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use utoipa::ToSchema;

/// Request body for document generation, as it arrives on the wire.
///
/// Field validation happens in [`GenerationRequest::try_from`], so every
/// JSON object deserializes into this type.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RawGenerationRequest {
    /// Base64 template bytes, an http(s) URL, or a tagged object
    /// (`{"kind": "inline", "data": ...}` / `{"kind": "url", "url": ...}`)
    #[serde(default)]
    pub template: Option<Value>,

    /// Variables made available to the template
    #[serde(default)]
    pub context: Option<Value>,
}

/// Successful generation response
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct GenerationResponse {
    /// Public URL of the stored document
    pub download_url: String,
}

/// Where the template bytes come from
#[derive(Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Template bytes supplied in the request (already decoded)
    Inline { data: Vec<u8> },
    /// Template fetched from a remote server
    Url { url: String },
}

impl TemplateSource {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            TemplateSource::Inline { .. } => "inline",
            TemplateSource::Url { .. } => "url",
        }
    }

    /// Interpret a plain string: http(s) URLs are fetched, anything else is base64.
    pub fn from_wire_str(value: &str) -> Result<Self, RequestError> {
        if value.trim().is_empty() {
            return Err(RequestError::MissingTemplate);
        }
        if is_http_url(value) {
            return Ok(TemplateSource::Url {
                url: value.to_string(),
            });
        }
        Self::inline(value)
    }

    /// Decode an inline payload; zero decoded bytes count as no template at all
    fn inline(encoded: &str) -> Result<Self, RequestError> {
        let data = decode_base64(encoded)?;
        if data.is_empty() {
            return Err(RequestError::MissingTemplate);
        }
        Ok(TemplateSource::Inline { data })
    }

    fn from_tagged(object: &Map<String, Value>) -> Result<Self, RequestError> {
        let member = |name: &'static str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .ok_or(RequestError::InvalidTemplateField(
                    "tagged template is missing a string member",
                ))
        };

        match object.get("kind").and_then(Value::as_str) {
            Some("inline") => Self::inline(member("data")?),
            Some("url") => {
                let url = member("url")?.trim();
                if url.is_empty() {
                    return Err(RequestError::MissingTemplate);
                }
                if !is_http_url(url) {
                    return Err(RequestError::InvalidTemplateField(
                        "template url must use http or https",
                    ));
                }
                Ok(TemplateSource::Url {
                    url: url.to_string(),
                })
            }
            _ => Err(RequestError::InvalidTemplateField(
                "template kind must be \"inline\" or \"url\"",
            )),
        }
    }
}

// Inline payloads can be megabytes; keep Debug output readable.
impl fmt::Debug for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Inline { data } => f
                .debug_struct("Inline")
                .field("len", &data.len())
                .finish(),
            TemplateSource::Url { url } => f.debug_struct("Url").field("url", url).finish(),
        }
    }
}

/// Validated generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub template: TemplateSource,
    pub context: Map<String, Value>,
}

impl TryFrom<RawGenerationRequest> for GenerationRequest {
    type Error = RequestError;

    fn try_from(raw: RawGenerationRequest) -> Result<Self, Self::Error> {
        let template = match raw.template {
            None | Some(Value::Null) => return Err(RequestError::MissingTemplate),
            Some(Value::String(s)) => TemplateSource::from_wire_str(&s)?,
            Some(Value::Object(object)) => TemplateSource::from_tagged(&object)?,
            Some(_) => {
                return Err(RequestError::InvalidTemplateField(
                    "template must be a string or an object",
                ))
            }
        };

        let context = match raw.context {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(object)) => object,
            Some(_) => return Err(RequestError::InvalidContext),
        };

        Ok(Self { template, context })
    }
}

/// Client-attributable problems with the request body fields
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("A template or template url must be submitted in the request body.")]
    MissingTemplate,

    #[error("Invalid template field: {0}")]
    InvalidTemplateField(&'static str),

    #[error("Template is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("Context must be a JSON object")]
    InvalidContext,
}

fn is_http_url(value: &str) -> bool {
    let lower = value
        .get(..8)
        .unwrap_or(value)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn decode_base64(value: &str) -> Result<Vec<u8>, RequestError> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| RequestError::InvalidEncoding(e.to_string()))
}
