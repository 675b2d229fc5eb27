//! JSON content negotiation, enforced before any handler touches the body.

use axum::{
    extract::Request,
    http::Method,
    middleware::Next,
    response::Response,
};

use super::headers::HeaderMapExt;
use crate::error::ApiError;

/// Reject requests that cannot take a JSON response or do not send a JSON body
pub async fn require_json(request: Request, next: Next) -> Result<Response, ApiError> {
    let headers = request.headers();

    if !headers.accepts_json() {
        return Err(ApiError::NotAcceptable);
    }

    if matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH)
        && !headers.has_json_content_type()
    {
        return Err(ApiError::UnsupportedMediaType);
    }

    Ok(next.run(request).await)
}
