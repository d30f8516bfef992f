//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Buffer the body under the configured limit
//! - Convert the axum request into the pipeline's canonical form
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An incoming `x-request-id` is kept, so callers can correlate

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::gateway::{GatewayRequest, REQUEST_ID_HEADER};

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Buffer an inbound request into a `GatewayRequest`.
pub async fn into_gateway_request(request: Request<Body>, max_body_bytes: usize) -> Result<GatewayRequest, Response> {
    let (parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = axum::body::to_bytes(body, max_body_bytes).await.map_err(|e| {
        tracing::debug!(request_id = %request_id, error = %e, "Rejected request body");
        payload_too_large()
    })?;

    Ok(GatewayRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
        request_id,
    })
}

fn payload_too_large() -> Response {
    let body = json!({
        "error": {
            "code": "PAYLOAD_TOO_LARGE",
            "message": "The request body exceeds the configured limit"
        }
    });
    (StatusCode::PAYLOAD_TOO_LARGE, axum::Json(body)).into_response()
}
