//! Cache key derivation.

use std::fmt::{self, Write};

use axum::http::{HeaderMap, Method};
use percent_encoding::{percent_encode, NON_ALPHANUMERIC};

use crate::routing::{CachePolicy, NormalizedPath};

/// Deterministic fingerprint of a cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Invalidation group the entry belongs to.
    pub region: String,
    signature: String,
}

impl CacheKey {
    /// Build a key from the parts of a request that the route's policy
    /// considers relevant, scoped to the route table `generation` that
    /// produced the route.
    ///
    /// Query pairs are decoded and sorted by name then value; when the
    /// policy lists no query keys every pair is relevant. Only the listed
    /// headers take part, compared by raw bytes. Every component is
    /// length-prefixed so distinct inputs never encode to the same
    /// signature.
    pub fn derive(
        generation: u64,
        route: &str,
        policy: &CachePolicy,
        method: &Method,
        path: &NormalizedPath,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> Self {
        let mut pairs: Vec<(String, String)> = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .filter_map(|(k, v)| {
                        if policy.query_keys.is_empty() {
                            return Some((k.into_owned(), v.into_owned()));
                        }
                        // Listed keys are matched ignoring case and keyed by their configured spelling.
                        policy
                            .query_keys
                            .iter()
                            .find(|key| key.eq_ignore_ascii_case(&k))
                            .map(|key| (key.clone(), v.into_owned()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        pairs.sort();

        let mut signature = String::new();
        push_field(&mut signature, &generation.to_string());
        push_field(&mut signature, route);
        push_field(&mut signature, method.as_str());
        push_field(&mut signature, &path.to_path_string());

        push_field(&mut signature, &pairs.len().to_string());
        for (name, value) in &pairs {
            push_field(&mut signature, name);
            push_field(&mut signature, value);
        }

        // `policy.header_keys` is already lower-cased and sorted. A missing
        // header has zero values, an empty one has a single empty value.
        for name in &policy.header_keys {
            push_field(&mut signature, name.as_str());
            let values: Vec<_> = headers.get_all(name).iter().collect();
            push_field(&mut signature, &values.len().to_string());
            for value in values {
                let encoded = percent_encode(value.as_bytes(), NON_ALPHANUMERIC).to_string();
                push_field(&mut signature, &encoded);
            }
        }

        Self {
            region: policy.region.clone(),
            signature,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

fn push_field(out: &mut String, field: &str) {
    let _ = write!(out, "{}:{}|", field.len(), field);
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};
    use std::time::Duration;

    fn policy(query_keys: &[&str], header_keys: &[&'static str]) -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(30),
            region: "orders".into(),
            query_keys: query_keys.iter().map(|k| k.to_string()).collect(),
            header_keys: header_keys.iter().map(|h| HeaderName::from_static(h)).collect(),
        }
    }

    fn key(policy: &CachePolicy, path: &str, query: Option<&str>, headers: &HeaderMap) -> CacheKey {
        CacheKey::derive(1, "orders", policy, &Method::GET, &NormalizedPath::parse(path), query, headers)
    }

    #[test]
    fn query_order_does_not_matter() {
        let p = policy(&[], &[]);
        let a = key(&p, "/orders", Some("userName=swn&page=1"), &HeaderMap::new());
        let b = key(&p, "/orders/", Some("page=1&userName=swn"), &HeaderMap::new());
        assert_eq!(a, b);
    }

    #[test]
    fn irrelevant_query_params_are_ignored() {
        let p = policy(&["userName"], &[]);
        let a = key(&p, "/orders", Some("userName=swn&_=123"), &HeaderMap::new());
        let b = key(&p, "/orders", Some("username=swn&_=456"), &HeaderMap::new());
        let c = key(&p, "/orders", Some("userName=abc"), &HeaderMap::new());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn only_listed_headers_take_part() {
        let p = policy(&[], &["accept-language"]);
        let mut en = HeaderMap::new();
        en.insert("accept-language", HeaderValue::from_static("en"));
        en.insert("x-request-id", HeaderValue::from_static("1"));
        let mut en2 = HeaderMap::new();
        en2.insert("accept-language", HeaderValue::from_static("en"));
        en2.insert("x-request-id", HeaderValue::from_static("2"));
        let mut tr = HeaderMap::new();
        tr.insert("accept-language", HeaderValue::from_static("tr"));

        assert_eq!(key(&p, "/orders", None, &en), key(&p, "/orders", None, &en2));
        assert_ne!(key(&p, "/orders", None, &en), key(&p, "/orders", None, &tr));
    }

    #[test]
    fn method_and_route_are_part_of_the_key() {
        let p = policy(&[], &[]);
        let path = NormalizedPath::parse("/orders");
        let get = CacheKey::derive(1, "orders", &p, &Method::GET, &path, None, &HeaderMap::new());
        let head = CacheKey::derive(1, "orders", &p, &Method::HEAD, &path, None, &HeaderMap::new());
        let other = CacheKey::derive(1, "archive", &p, &Method::GET, &path, None, &HeaderMap::new());
        assert_ne!(get, head);
        assert_ne!(get, other);
        assert_eq!(get.region, "orders");
    }

    #[test]
    fn header_values_cannot_forge_other_headers() {
        let p = policy(&[], &["authorization", "x-tenant"]);
        let mut a = HeaderMap::new();
        a.insert("authorization", HeaderValue::from_static("tok;x-tenant=t1"));
        let mut b = HeaderMap::new();
        b.insert("authorization", HeaderValue::from_static("tok"));
        b.insert("x-tenant", HeaderValue::from_static("t1;x-tenant="));

        assert_ne!(key(&p, "/Order/swn", None, &a), key(&p, "/Order/swn", None, &b));
    }

    #[test]
    fn non_utf8_header_values_are_distinguished() {
        let p = policy(&[], &["authorization"]);
        let mut alice = HeaderMap::new();
        alice.insert("authorization", HeaderValue::from_bytes(b"Bearer \xe9alice").unwrap());
        let mut bob = HeaderMap::new();
        bob.insert("authorization", HeaderValue::from_bytes(b"Bearer \xe9bob").unwrap());

        assert_ne!(key(&p, "/Order/swn", None, &alice), key(&p, "/Order/swn", None, &bob));
    }

    #[test]
    fn missing_header_differs_from_empty_header() {
        let p = policy(&[], &["authorization"]);
        let mut empty = HeaderMap::new();
        empty.insert("authorization", HeaderValue::from_static(""));

        assert_ne!(key(&p, "/orders", None, &HeaderMap::new()), key(&p, "/orders", None, &empty));
    }

    #[test]
    fn route_names_cannot_absorb_other_components() {
        let p = policy(&[], &[]);
        let path = NormalizedPath::parse("/orders");
        let a = CacheKey::derive(1, "a|GET", &p, &Method::GET, &path, None, &HeaderMap::new());
        let b = CacheKey::derive(1, "a", &p, &Method::GET, &path, None, &HeaderMap::new());
        assert_ne!(a, b);
    }

    #[test]
    fn generation_is_part_of_the_key() {
        let p = policy(&[], &[]);
        let path = NormalizedPath::parse("/orders");
        let old = CacheKey::derive(1, "orders", &p, &Method::GET, &path, None, &HeaderMap::new());
        let new = CacheKey::derive(2, "orders", &p, &Method::GET, &path, None, &HeaderMap::new());
        assert_ne!(old, new);
    }
}
