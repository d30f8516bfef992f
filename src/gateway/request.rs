//! Canonical request and response forms used by the pipeline.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::json;

use crate::dispatch::{DownstreamResponse, Fault, FaultKind};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// An inbound request after the HTTP front end has parsed it.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    /// Raw request path, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub request_id: String,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            request_id: String::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }
}

/// How the cache took part in a response. Sent as `x-gateway-cache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// The route, the method or the gateway does not cache.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// Which path a request took through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoMatch,
    CacheHit,
    Dispatched,
    Faulted,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::NoMatch => "no_match",
            Outcome::CacheHit => "cache_hit",
            Outcome::Dispatched => "dispatched",
            Outcome::Faulted => "faulted",
        }
    }
}

/// The single response produced for every request.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub cache: CacheStatus,
    /// Name of the matched route, if any.
    pub route: Option<String>,
    pub outcome: Outcome,
}

impl GatewayResponse {
    pub fn from_downstream(response: DownstreamResponse, route: &str, cache: CacheStatus, outcome: Outcome) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            cache,
            route: Some(route.to_string()),
            outcome,
        }
    }

    /// Client-facing form of a fault: status and a generic message only.
    pub fn from_fault(fault: &Fault, cache: CacheStatus) -> Self {
        let mut response = error_response(fault.kind.status(), fault.kind.code(), fault.kind.client_message());
        response.cache = cache;
        response.route = Some(fault.route.clone()).filter(|r| !r.is_empty());
        response.outcome = Outcome::Faulted;
        response
    }

    pub fn no_match() -> Self {
        error_response(StatusCode::NOT_FOUND, FaultKind::NotFound.code(), "No route matches the request")
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> GatewayResponse {
    let body = json!({ "error": { "code": code, "message": message } });
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    GatewayResponse {
        status,
        headers,
        body: Bytes::from(body.to_string()),
        cache: CacheStatus::Bypass,
        route: None,
        outcome: Outcome::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_body_hides_detail() {
        let mut fault = Fault::unavailable("connect failed: tcp connect error 10.0.0.7:8003");
        fault.route = "discount".into();
        fault.target = "http://10.0.0.7:8003".into();

        let response = GatewayResponse::from_fault(&fault, CacheStatus::Miss);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.outcome, Outcome::Faulted);

        let body = String::from_utf8(response.body.to_vec()).unwrap();
        assert!(!body.contains("10.0.0.7"));
        assert!(!body.contains("discount"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"]["code"], "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn no_match_is_not_found() {
        let response = GatewayResponse::no_match();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.cache, CacheStatus::Bypass);
        assert!(response.route.is_none());
    }
}
