use axum::{
    body::{Body, Bytes},
    extract::State,
    http::HeaderMap,
    response::Json,
};
use http_body_util::LengthLimitError;
use std::sync::Arc;

use super::headers::HeaderMapExt;
use crate::error::ApiError;
use crate::models::{AppConfig, GenerationRequest, GenerationResponse, RawGenerationRequest};
use crate::services::GenerationPipeline;

/// Generate a document
///
/// Renders the submitted template with the given context, stores the result
/// in object storage and returns its public download URL.
#[utoipa::path(
    post,
    path = "/v1",
    request_body = RawGenerationRequest,
    responses(
        (status = 200, description = "Document generated", body = GenerationResponse),
        (status = 400, description = "Empty body, missing template or invalid field"),
        (status = 406, description = "Client does not accept JSON"),
        (status = 413, description = "Request body or fetched template too large"),
        (status = 415, description = "Request body is not JSON"),
        (status = 422, description = "Template could not be parsed"),
        (status = 500, description = "Rendering or storage failed"),
        (status = 502, description = "Template URL unreachable"),
        (status = 753, description = "Malformed JSON body"),
    ),
    tag = "Documents"
)]
pub async fn handle_generate(
    State(pipeline): State<Arc<GenerationPipeline>>,
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<GenerationResponse>, ApiError> {
    let limit = config.max_body_bytes;

    // Refuse oversized bodies before reading a single byte
    if let Some(length) = headers.content_length() {
        if length > limit as u64 {
            return Err(ApiError::PayloadTooLarge { limit });
        }
    }

    let bytes = read_body(body, limit).await?;
    let request = parse_request(&bytes)?;

    tracing::info!(source = request.template.kind(), "Generation request received");

    let response = pipeline.generate(request).await?;
    Ok(Json(response))
}

/// Read the full body, never buffering more than `limit` bytes
async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if e.into_inner().downcast_ref::<LengthLimitError>().is_some() {
            ApiError::PayloadTooLarge { limit }
        } else {
            ApiError::UnreadableBody
        }
    })
}

/// Decode and validate the JSON envelope
fn parse_request(bytes: &[u8]) -> Result<GenerationRequest, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::EmptyBody);
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|_| ApiError::MalformedJson)?;
    let serde_json::Value::Object(mut object) = value else {
        return Err(ApiError::InvalidRequest("request body must be a JSON object"));
    };

    let raw = RawGenerationRequest {
        template: object.remove("template"),
        context: object.remove("context"),
    };

    Ok(GenerationRequest::try_from(raw)?)
}
