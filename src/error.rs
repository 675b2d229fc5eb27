use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::RequestError;
use crate::services::{FetchError, PipelineError, RenderError};

/// Non-standard status used for syntactically invalid JSON bodies
pub const MALFORMED_JSON_STATUS: u16 = 753;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("This API only supports responses encoded as JSON.")]
    NotAcceptable,

    #[error("This API only supports requests encoded as JSON.")]
    UnsupportedMediaType,

    #[error("The size of the request is too large. The body must not exceed {limit} bytes in length.")]
    PayloadTooLarge { limit: usize },

    #[error("Empty request body. A valid JSON document is required.")]
    EmptyBody,

    #[error("Could not decode the request body. The JSON was incorrect or not encoded as UTF-8.")]
    MalformedJson,

    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("The request body could not be read completely.")]
    UnreadableBody,

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::EmptyBody
            | ApiError::InvalidRequest(_)
            | ApiError::UnreadableBody
            | ApiError::Request(_) => StatusCode::BAD_REQUEST,
            ApiError::MalformedJson => {
                StatusCode::from_u16(MALFORMED_JSON_STATUS).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ApiError::Pipeline(PipelineError::Fetch(e)) => match e {
                FetchError::Status(code) if (400..500).contains(code) => {
                    StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                FetchError::Status(_) | FetchError::Unreachable(_) => StatusCode::BAD_GATEWAY,
                FetchError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                FetchError::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Pipeline(PipelineError::Render(RenderError::InvalidTemplate(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotAcceptable => "not_acceptable",
            ApiError::UnsupportedMediaType => "unsupported_media_type",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::EmptyBody => "empty_body",
            ApiError::MalformedJson => "malformed_json",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::UnreadableBody => "unreadable_body",
            ApiError::Request(e) => match e {
                RequestError::MissingTemplate => "missing_template",
                RequestError::InvalidTemplateField(_) => "invalid_template_field",
                RequestError::InvalidEncoding(_) => "invalid_encoding",
                RequestError::InvalidContext => "invalid_context",
            },
            ApiError::Pipeline(e) => match e {
                PipelineError::Fetch(FetchError::Unreachable(_)) => "template_unreachable",
                PipelineError::Fetch(FetchError::Status(_)) => "template_fetch_failed",
                PipelineError::Fetch(FetchError::TooLarge { .. }) => "template_too_large",
                PipelineError::Fetch(FetchError::Client(_)) => "internal",
                PipelineError::Render(RenderError::InvalidTemplate(_)) => "invalid_template",
                PipelineError::Render(RenderError::Engine(_)) => "render_failed",
                PipelineError::Store(_) => "storage_failed",
            },
        }
    }

    /// Message safe to hand to the caller
    fn public_message(&self) -> String {
        match self {
            ApiError::Pipeline(PipelineError::Render(RenderError::Engine(_))) => {
                "Failed to render document".to_string()
            }
            ApiError::Pipeline(PipelineError::Store(_)) => "Failed to store document".to_string(),
            ApiError::Pipeline(PipelineError::Fetch(FetchError::Client(_))) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::warn!(code = self.code(), status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Json(json!({
            "status": status.as_u16(),
            "code": self.code(),
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StoreError;

    #[test]
    fn test_api_error_messages() {
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 10 }.to_string(),
            "The size of the request is too large. The body must not exceed 10 bytes in length."
        );
        assert_eq!(
            ApiError::Request(RequestError::MissingTemplate).to_string(),
            "A template or template url must be submitted in the request body."
        );
    }

    #[test]
    fn test_protocol_error_status_codes() {
        assert_eq!(ApiError::NotAcceptable.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(
            ApiError::UnsupportedMediaType.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(ApiError::EmptyBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::MalformedJson.status().as_u16(), 753);
    }

    #[test]
    fn test_fetch_error_status_codes() {
        let fetch = |e| ApiError::Pipeline(PipelineError::Fetch(e)).status();

        assert_eq!(
            fetch(FetchError::Unreachable("refused".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(fetch(FetchError::Status(404)), StatusCode::NOT_FOUND);
        assert_eq!(fetch(FetchError::Status(403)), StatusCode::FORBIDDEN);
        assert_eq!(fetch(FetchError::Status(503)), StatusCode::BAD_GATEWAY);
        assert_eq!(fetch(FetchError::Status(304)), StatusCode::BAD_GATEWAY);
        assert_eq!(
            fetch(FetchError::TooLarge { max: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_render_error_classification() {
        let invalid = ApiError::Pipeline(PipelineError::Render(RenderError::InvalidTemplate(
            "syntax".into(),
        )));
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(invalid.code(), "invalid_template");

        let engine = ApiError::Pipeline(PipelineError::Render(RenderError::Engine(
            "boom".into(),
        )));
        assert_eq!(engine.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(engine.code(), "render_failed");
    }

    #[test]
    fn test_server_errors_hide_details() {
        let error = ApiError::Pipeline(PipelineError::Store(StoreError::Upload(
            "secret=abc".into(),
        )));
        assert_eq!(error.public_message(), "Failed to store document");

        let error = ApiError::Pipeline(PipelineError::Fetch(FetchError::Client(
            "tls backend: /etc/ssl/private".into(),
        )));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), "Internal server error");
    }

    #[test]
    fn test_request_error_codes() {
        assert_eq!(
            ApiError::from(RequestError::MissingTemplate).code(),
            "missing_template"
        );
        assert_eq!(
            ApiError::from(RequestError::InvalidEncoding("x".into())).code(),
            "invalid_encoding"
        );
        assert_eq!(
            ApiError::from(RequestError::InvalidContext).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_api_error_into_response_status_codes() {
        let response = ApiError::NotAcceptable.into_response();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

        let response = ApiError::MalformedJson.into_response();
        assert_eq!(response.status().as_u16(), MALFORMED_JSON_STATUS);

        let response = ApiError::UnreadableBody.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
