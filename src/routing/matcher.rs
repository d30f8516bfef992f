//! Route matching logic.
//!
//! # Responsibilities
//! - Normalize the request path (percent-decode, strip trailing slash)
//! - Test routes in declaration order
//! - Match method AND path template; capture placeholder values
//!
//! # Design Decisions
//! - First match wins, not best match: an earlier, broader route shadows a
//!   later, more specific one. Operators order routes accordingly.
//! - Method names are case-sensitive tokens (already upper-cased at load)
//! - Path literals are case-sensitive
//! - No regex to guarantee O(n) matching

use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::routing::table::{RouteDefinition, RouteTable};
use crate::routing::template::{NormalizedPath, PathParams};

/// A successful match.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The winning route.
    pub route: Arc<RouteDefinition>,
    /// Values captured by the route's placeholders.
    pub params: PathParams,
    /// The normalized request path.
    pub path: NormalizedPath,
}

/// No route accepts the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatch {
    pub method: Method,
    pub path: String,
}

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no route matches {} {}", self.method, self.path)
    }
}

impl std::error::Error for NoMatch {}

impl RouteDefinition {
    /// Returns the captured parameters if this route accepts the request.
    pub fn matches(&self, method: &Method, path: &NormalizedPath) -> Option<PathParams> {
        if !self.methods.allows(method) {
            return None;
        }
        self.upstream.match_path(path)
    }
}

/// Resolve a request against a table. Pure and non-blocking.
pub fn match_route(table: &RouteTable, method: &Method, raw_path: &str) -> Result<RouteMatch, NoMatch> {
    let path = NormalizedPath::parse(raw_path);

    table
        .routes()
        .iter()
        .find_map(|route| {
            route.matches(method, &path).map(|params| RouteMatch {
                route: Arc::clone(route),
                params,
                path: path.clone(),
            })
        })
        .ok_or_else(|| NoMatch {
            method: method.clone(),
            path: raw_path.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    fn route(name: &str, template: &str, methods: &[&str]) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            upstream_path_template: template.into(),
            upstream_http_methods: methods.iter().map(|m| m.to_string()).collect(),
            transport: "http".into(),
            downstream_scheme: "http".into(),
            downstream_host: "localhost".into(),
            downstream_port: 8000,
            downstream_path_template: None,
            rpc_service: None,
            timeout_ms: None,
            cache: None,
        }
    }

    #[test]
    fn matches_method_and_path() {
        let table = RouteTable::load(&[
            route("get-discount", "/Discount/{productName}", &["GET"]),
            route("delete-discount", "/Discount/{productName}", &["DELETE"]),
        ])
        .unwrap();

        let m = match_route(&table, &Method::DELETE, "/Discount/IPhone").unwrap();
        assert_eq!(m.route.name, "delete-discount");
        assert_eq!(m.params.get("productName"), Some("IPhone"));

        let err = match_route(&table, &Method::POST, "/Discount/IPhone").unwrap_err();
        assert_eq!(err.method, Method::POST);
    }

    #[test]
    fn earlier_declaration_wins() {
        let broad_first = RouteTable::load(&[
            route("broad", "/Order/{userName}", &["GET"]),
            route("specific", "/Order/swn/", &["GET"]),
        ]);
        // Different normalized templates, so both load.
        let table = broad_first.unwrap();
        for _ in 0..3 {
            let m = match_route(&table, &Method::GET, "/Order/swn").unwrap();
            assert_eq!(m.route.name, "broad");
        }

        let specific_first = RouteTable::load(&[
            route("specific", "/Order/swn", &["GET"]),
            route("broad", "/Order/{userName}", &["GET"]),
        ])
        .unwrap();
        let m = match_route(&specific_first, &Method::GET, "/Order/swn").unwrap();
        assert_eq!(m.route.name, "specific");
        let m = match_route(&specific_first, &Method::GET, "/Order/other").unwrap();
        assert_eq!(m.route.name, "broad");
    }

    #[test]
    fn trailing_slash_and_escapes_are_normalized() {
        let table = RouteTable::load(&[route("discount", "/Discount/{productName}", &["GET"])]).unwrap();

        let m = match_route(&table, &Method::GET, "/Discount/Samsung%2010/").unwrap();
        assert_eq!(m.params.get("productName"), Some("Samsung 10"));
        assert_eq!(m.path.to_path_string(), "/Discount/Samsung%2010");
    }

    #[test]
    fn any_method_route() {
        let table = RouteTable::load(&[route("all", "/orders", &[])]).unwrap();
        assert!(match_route(&table, &Method::PATCH, "/orders").is_ok());
        assert!(match_route(&table, &Method::GET, "/orders/1").is_err());
    }

    #[test]
    fn empty_table_never_matches() {
        let table = RouteTable::default();
        let err = match_route(&table, &Method::GET, "/").unwrap_err();
        assert_eq!(err.to_string(), "no route matches GET /");
    }
}
