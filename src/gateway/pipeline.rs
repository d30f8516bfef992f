//! Request orchestration: match, cache lookup, dispatch, cache write.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderValue, Method};

use crate::cache::{CacheKey, CacheStore};
use crate::config::{load_config, ConfigError, RouteConfig};
use crate::dispatch::{DownstreamRequest, DownstreamResponse, Dispatcher};
use crate::gateway::request::{CacheStatus, GatewayRequest, GatewayResponse, Outcome, REQUEST_ID_HEADER};
use crate::gateway::stage::{Stage, StageTracker};
use crate::observability::metrics;
use crate::routing::{match_route, CachePolicy, RouteTable, RouteTableHandle};

/// Turns every request into exactly one response.
#[derive(Clone)]
pub struct GatewayPipeline {
    routes: Arc<RouteTableHandle>,
    cache: Arc<dyn CacheStore>,
    dispatcher: Dispatcher,
    cache_enabled: bool,
}

impl GatewayPipeline {
    pub fn new(
        routes: Arc<RouteTableHandle>,
        cache: Arc<dyn CacheStore>,
        dispatcher: Dispatcher,
        cache_enabled: bool,
    ) -> Self {
        Self {
            routes,
            cache,
            dispatcher,
            cache_enabled,
        }
    }

    pub fn routes(&self) -> &Arc<RouteTableHandle> {
        &self.routes
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        let start = Instant::now();
        let mut stage = StageTracker::new(&request.request_id);

        let table = self.routes.load();
        let matched = match match_route(&table, &request.method, &request.path) {
            Ok(matched) => matched,
            Err(no_match) => {
                tracing::debug!(request_id = %request.request_id, "{}", no_match);
                stage.advance(Stage::Responded);
                let response = GatewayResponse::no_match();
                metrics::record_request("none", response.status.as_u16(), response.outcome.as_str(), start);
                return response;
            }
        };
        stage.advance(Stage::Matched);
        let route = matched.route.clone();

        let cache_key = self.cache_policy(&request.method, route.cache.as_ref()).map(|policy| {
            // Keyed by the generation the route came from, so a write that
            // lands after a reload is never served under the new table.
            let key = CacheKey::derive(
                table.generation(),
                &route.name,
                policy,
                &request.method,
                &matched.path,
                request.query.as_deref(),
                &request.headers,
            );
            (key, policy.ttl)
        });

        let cache_status = match &cache_key {
            Some((key, _)) => match self.cache.get(key).await {
                Ok(Some(entry)) => {
                    stage.advance(Stage::CacheHit);
                    metrics::record_cache_event("hit");
                    tracing::debug!(
                        request_id = %request.request_id,
                        route = %route.name,
                        "Served from cache"
                    );

                    let mut cached = entry.response;
                    let age = entry.inserted_at.elapsed().as_secs();
                    cached.headers.insert(header::AGE, HeaderValue::from(age));

                    stage.advance(Stage::Responded);
                    let response =
                        GatewayResponse::from_downstream(cached, &route.name, CacheStatus::Hit, Outcome::CacheHit);
                    metrics::record_request(&route.name, response.status.as_u16(), response.outcome.as_str(), start);
                    return response;
                }
                Ok(None) => {
                    stage.advance(Stage::CacheMiss);
                    metrics::record_cache_event("miss");
                    CacheStatus::Miss
                }
                Err(e) => {
                    stage.advance(Stage::CacheMiss);
                    metrics::record_cache_event("lookup_error");
                    tracing::warn!(
                        request_id = %request.request_id,
                        route = %route.name,
                        error = %e,
                        "Cache lookup failed, treating as miss"
                    );
                    CacheStatus::Miss
                }
            },
            None => {
                metrics::record_cache_event("bypass");
                CacheStatus::Bypass
            }
        };

        let mut headers = request.headers;
        if !request.request_id.is_empty() && !headers.contains_key(REQUEST_ID_HEADER) {
            if let Ok(value) = HeaderValue::from_str(&request.request_id) {
                headers.insert(REQUEST_ID_HEADER, value);
            }
        }
        let downstream = DownstreamRequest::from_match(&matched, request.method, request.query, headers, request.body);

        stage.advance(Stage::Dispatching);
        let response = match self.dispatcher.dispatch(&route, downstream).await {
            Ok(response) => {
                stage.advance(Stage::Succeeded);
                tracing::debug!(
                    request_id = %request.request_id,
                    route = %route.name,
                    target = %route.target,
                    status = response.status.as_u16(),
                    "Downstream responded"
                );
                if let Some((key, ttl)) = cache_key {
                    if response.status.is_success() {
                        self.store(key, cacheable(&response), ttl, &request.request_id).await;
                    }
                }
                GatewayResponse::from_downstream(response, &route.name, cache_status, Outcome::Dispatched)
            }
            Err(fault) => {
                stage.advance(Stage::Faulted);
                tracing::warn!(
                    request_id = %request.request_id,
                    route = %fault.route,
                    target = %fault.target,
                    fault = %fault.kind,
                    "{}",
                    fault
                );
                metrics::record_fault(&route.name, fault.kind.as_str());
                GatewayResponse::from_fault(&fault, cache_status)
            }
        };

        stage.advance(Stage::Responded);
        metrics::record_request(&route.name, response.status.as_u16(), response.outcome.as_str(), start);
        response
    }

    /// Replace the route table. The cache is cleared on success so no entry
    /// built under an old route definition is served.
    pub async fn reload(&self, routes: &[RouteConfig]) -> Result<Arc<RouteTable>, ConfigError> {
        match self.routes.reload(routes) {
            Ok(table) => {
                metrics::record_reload("success");
                let cleared = match self.cache.clear(None).await {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to clear cache after reload");
                        0
                    }
                };
                tracing::info!(
                    generation = table.generation(),
                    routes = table.len(),
                    cleared_entries = cleared,
                    "Route table reloaded"
                );
                Ok(table)
            }
            Err(e) => {
                metrics::record_reload("failure");
                tracing::error!(
                    error = %e,
                    generation = self.routes.load().generation(),
                    "Route table reload rejected, keeping current table"
                );
                Err(e)
            }
        }
    }

    /// Re-read the configuration file and apply its routes. Only the route
    /// table is hot-reloadable; other sections take effect on restart.
    pub async fn reload_from_file(&self, path: &Path) -> Result<Arc<RouteTable>, ConfigError> {
        let config = match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                metrics::record_reload("failure");
                tracing::error!(path = %path.display(), error = %e, "Failed to load configuration for reload");
                return Err(e);
            }
        };
        self.reload(&config.routes).await
    }

    /// Caching applies to reads on routes with a policy, while the gateway
    /// cache is on.
    fn cache_policy<'a>(&self, method: &Method, policy: Option<&'a CachePolicy>) -> Option<&'a CachePolicy> {
        if !self.cache_enabled || !(method == Method::GET || method == Method::HEAD) {
            return None;
        }
        policy
    }

    async fn store(&self, key: CacheKey, response: DownstreamResponse, ttl: std::time::Duration, request_id: &str) {
        match self.cache.put(key, response, ttl).await {
            Ok(()) => metrics::record_cache_event("store"),
            Err(e) => {
                metrics::record_cache_event("store_error");
                tracing::warn!(request_id, error = %e, "Cache write skipped");
            }
        }
    }
}

/// The part of a response that may be replayed to other clients.
fn cacheable(response: &DownstreamResponse) -> DownstreamResponse {
    let mut stored = response.clone();
    stored.headers.remove(header::SET_COOKIE);
    stored
}
