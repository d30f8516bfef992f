//! Transport-agnostic request/response envelopes.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};

use crate::routing::{PathParams, RouteMatch};

/// Headers that describe a single hop and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Request envelope handed to a transport.
#[derive(Debug, Clone)]
pub struct DownstreamRequest {
    pub method: Method,
    /// Downstream path after template rewriting.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Placeholder values captured from the upstream path.
    pub params: PathParams,
}

impl DownstreamRequest {
    /// Build the envelope for a matched route. The path is rewritten through
    /// the route's downstream template when it has one.
    pub fn from_match(
        matched: &RouteMatch,
        method: Method,
        query: Option<String>,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        strip_hop_by_hop(&mut headers);

        let path = matched
            .route
            .downstream_path
            .as_ref()
            .and_then(|template| template.render(&matched.params))
            .unwrap_or_else(|| matched.path.to_path_string());

        Self {
            method,
            path,
            query: query.filter(|q| !q.is_empty()),
            headers,
            body,
            params: matched.params.clone(),
        }
    }

    /// Path plus query string, as it goes on the wire.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// First value of a query parameter, matched ignoring ASCII case.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.into_owned())
    }
}

/// Response envelope normalized from any transport.
#[derive(Debug, Clone, PartialEq)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl DownstreamResponse {
    /// A JSON response with the given status.
    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Bytes::from(body),
        }
    }
}
