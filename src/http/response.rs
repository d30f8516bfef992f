//! Response handling.
//!
//! # Responsibilities
//! - Turn a `GatewayResponse` into an HTTP response
//! - Add the `x-gateway-cache` header
//!
//! # Design Decisions
//! - `x-request-id` is copied back by `PropagateRequestIdLayer`, not here
//! - Bodies are already buffered; no streaming

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::gateway::GatewayResponse;

pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-gateway-cache");

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(self.cache.as_str()));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{CacheStatus, Outcome};
    use axum::body::Bytes;
    use axum::http::{header, HeaderMap, StatusCode};

    #[tokio::test]
    async fn carries_status_headers_and_cache_marker() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let response = GatewayResponse {
            status: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(b"{\"id\":1}"),
            cache: CacheStatus::Hit,
            route: Some("discount".into()),
            outcome: Outcome::CacheHit,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CACHE_STATUS_HEADER], "HIT");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"{\"id\":1}");
    }
}
