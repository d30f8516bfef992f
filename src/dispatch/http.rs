//! HTTP passthrough transport.
//!
//! # Responsibilities
//! - Rewrite authority to the route's downstream target
//! - Preserve method, headers (minus hop-by-hop) and body
//! - Map downstream status codes 1:1
//! - Classify client errors as faults
//!
//! # Design Decisions
//! - Response bodies are buffered so they can be cached; the buffer is
//!   bounded and an oversized body is an internal fault
//! - Connect failures are `unavailable`; every other client error is
//!   `internal`

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::dispatch::envelope::{strip_hop_by_hop, DownstreamRequest, DownstreamResponse};
use crate::dispatch::fault::Fault;
use crate::dispatch::Transport;
use crate::routing::RouteDefinition;

/// Forwards requests to HTTP downstreams.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    max_body_bytes: usize,
}

impl HttpForwarder {
    pub fn new(connect_timeout: Duration, max_body_bytes: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl Transport for HttpForwarder {
    async fn call(
        &self,
        route: &RouteDefinition,
        request: DownstreamRequest,
        _timeout: Duration,
    ) -> Result<DownstreamResponse, Fault> {
        let uri_text = format!("{}{}", route.target.base_uri(), request.path_and_query());
        let uri: Uri = uri_text
            .parse()
            .map_err(|e| Fault::internal(format!("invalid downstream uri '{}': {}", uri_text, e)))?;

        let mut headers = request.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        let host = HeaderValue::from_str(&route.target.authority())
            .map_err(|e| Fault::internal(format!("invalid downstream authority: {}", e)))?;
        headers.insert(header::HOST, host);

        let mut outbound = Request::new(Body::from(request.body));
        *outbound.method_mut() = request.method;
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        tracing::debug!(
            route = %route.name,
            uri = %uri_text,
            "Forwarding over HTTP"
        );

        let response = self.client.request(outbound).await.map_err(|e| {
            if e.is_connect() {
                Fault::unavailable(format!("connect failed: {}", e))
            } else {
                Fault::internal(format!("upstream request failed: {}", e))
            }
        })?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| Fault::internal(format!("failed to read downstream body: {}", e)))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        // The body is re-framed by our server.
        headers.remove(header::CONTENT_LENGTH);

        Ok(DownstreamResponse {
            status: parts.status,
            headers,
            body,
        })
    }
}
