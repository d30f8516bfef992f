//! Compiled route table and its hot-swappable handle.
//!
//! # Responsibilities
//! - Compile `RouteConfig`s into immutable `RouteDefinition`s
//! - Reject tables with colliding (method, normalized template) pairs
//! - Publish new tables atomically on reload
//!
//! # Design Decisions
//! - Declaration order is preserved; it decides matching precedence
//! - Tables are built off to the side and published with one `ArcSwap`
//!   store, so readers see either the old or the new table, never a mix
//! - A failed reload leaves the live table untouched

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::http::{HeaderName, Method};
use serde::Serialize;

use crate::config::{ConfigError, RouteCacheConfig, RouteConfig};
use crate::routing::template::PathTemplate;

/// Downstream transport used by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Http,
    Grpc,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::Grpc => "grpc",
        }
    }
}

impl FromStr for TransportKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(TransportKind::Http),
            "grpc" | "rpc" => Ok(TransportKind::Grpc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RPC services the gateway knows how to translate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcService {
    /// Coupon/discount lookup service (`DiscountProtoService`).
    Discount,
}

impl FromStr for RpcService {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "discount" => Ok(RpcService::Discount),
            _ => Err(()),
        }
    }
}

/// Which upstream methods a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Only(Vec<Method>),
}

impl MethodFilter {
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(methods) => methods.contains(method),
        }
    }

    /// First method accepted by both filters, rendered for error messages.
    fn overlap(&self, other: &MethodFilter) -> Option<String> {
        match (self, other) {
            (MethodFilter::Any, MethodFilter::Any) => Some("*".to_string()),
            (MethodFilter::Any, MethodFilter::Only(m)) | (MethodFilter::Only(m), MethodFilter::Any) => {
                m.first().map(|m| m.to_string())
            }
            (MethodFilter::Only(a), MethodFilter::Only(b)) => {
                a.iter().find(|m| b.contains(m)).map(|m| m.to_string())
            }
        }
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodFilter::Any => f.write_str("*"),
            MethodFilter::Only(methods) => {
                let names: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

/// Where a route's traffic goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownstreamTarget {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl DownstreamTarget {
    /// `host:port`, used as the URI authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `scheme://host:port`.
    pub fn base_uri(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl fmt::Display for DownstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_uri())
    }
}

/// Effective caching policy of a route. Only present when caching is on
/// and the TTL is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub region: String,
    /// Relevant query parameters; empty means all.
    pub query_keys: Vec<String>,
    /// Relevant request headers.
    pub header_keys: Vec<HeaderName>,
}

impl CachePolicy {
    fn from_config(route: &str, config: &RouteCacheConfig) -> Result<Option<Self>, ConfigError> {
        // TTL = 0 means caching is disabled for the route.
        if !config.enabled || config.ttl_secs == 0 {
            return Ok(None);
        }

        let mut header_keys = Vec::with_capacity(config.header_keys.len());
        for name in &config.header_keys {
            let header = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()).map_err(|_| {
                ConfigError::InvalidCacheHeader {
                    route: route.to_string(),
                    header: name.clone(),
                }
            })?;
            header_keys.push(header);
        }
        header_keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut query_keys = config.query_keys.clone();
        query_keys.sort();

        Ok(Some(Self {
            ttl: Duration::from_secs(config.ttl_secs),
            region: config.region.clone().unwrap_or_else(|| route.to_string()),
            query_keys,
            header_keys,
        }))
    }
}

/// A compiled, immutable route.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub name: String,
    pub upstream: PathTemplate,
    pub methods: MethodFilter,
    pub transport: TransportKind,
    pub target: DownstreamTarget,
    pub downstream_path: Option<PathTemplate>,
    pub rpc_service: Option<RpcService>,
    pub timeout: Option<Duration>,
    pub cache: Option<CachePolicy>,
}

impl RouteDefinition {
    /// Compile a single route configuration.
    pub fn compile(config: &RouteConfig) -> Result<Self, ConfigError> {
        let methods = parse_methods(config)?;

        let name = if config.name.trim().is_empty() {
            format!("{} {}", methods, config.upstream_path_template)
        } else {
            config.name.clone()
        };

        let upstream = PathTemplate::parse(&config.upstream_path_template).map_err(|reason| {
            ConfigError::InvalidTemplate {
                route: name.clone(),
                template: config.upstream_path_template.clone(),
                reason,
            }
        })?;

        let transport: TransportKind = config.transport.parse().map_err(|_| ConfigError::UnknownTransport {
            route: name.clone(),
            kind: config.transport.clone(),
        })?;

        let downstream_path = match &config.downstream_path_template {
            Some(raw) => {
                let template = PathTemplate::parse(raw).map_err(|reason| ConfigError::InvalidTemplate {
                    route: name.clone(),
                    template: raw.clone(),
                    reason,
                })?;
                let captured: Vec<&str> = upstream.placeholders().collect();
                if let Some(unbound) = template.placeholders().find(|p| !captured.contains(p)) {
                    return Err(ConfigError::InvalidTemplate {
                        route: name.clone(),
                        template: raw.clone(),
                        reason: format!("placeholder '{{{}}}' is not captured by the upstream template", unbound),
                    });
                }
                Some(template)
            }
            None => None,
        };

        let rpc_service = match transport {
            TransportKind::Grpc => {
                let service = config.rpc_service.as_deref().unwrap_or("discount");
                let service: RpcService = service.parse().map_err(|_| ConfigError::UnknownRpcService {
                    route: name.clone(),
                    service: service.to_string(),
                })?;
                if let MethodFilter::Only(methods) = &methods {
                    let supported = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
                    if let Some(m) = methods.iter().find(|m| !supported.contains(m)) {
                        return Err(ConfigError::UnsupportedMethod {
                            route: name.clone(),
                            method: m.to_string(),
                            transport: transport.to_string(),
                        });
                    }
                }
                Some(service)
            }
            TransportKind::Http => None,
        };

        let cache = match &config.cache {
            Some(c) => CachePolicy::from_config(&name, c)?,
            None => None,
        };

        Ok(Self {
            name,
            upstream,
            methods,
            transport,
            target: DownstreamTarget {
                scheme: config.downstream_scheme.to_ascii_lowercase(),
                host: config.downstream_host.clone(),
                port: config.downstream_port,
            },
            downstream_path,
            rpc_service,
            timeout: config.timeout_ms.map(Duration::from_millis),
            cache,
        })
    }
}

fn parse_methods(config: &RouteConfig) -> Result<MethodFilter, ConfigError> {
    if config.upstream_http_methods.is_empty() {
        return Ok(MethodFilter::Any);
    }
    let mut methods = Vec::with_capacity(config.upstream_http_methods.len());
    for raw in &config.upstream_http_methods {
        let method = Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
            ConfigError::InvalidMethod {
                route: if config.name.is_empty() {
                    config.upstream_path_template.clone()
                } else {
                    config.name.clone()
                },
                method: raw.clone(),
            }
        })?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    Ok(MethodFilter::Only(methods))
}

/// An ordered, immutable set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteDefinition>>,
    generation: u64,
}

impl RouteTable {
    /// Compile and check a full set of route configurations.
    pub fn load(configs: &[RouteConfig]) -> Result<Self, ConfigError> {
        let mut routes: Vec<Arc<RouteDefinition>> = Vec::with_capacity(configs.len());

        for config in configs {
            let route = RouteDefinition::compile(config)?;
            let normalized = route.upstream.normalized();

            for existing in &routes {
                if existing.upstream.normalized() != normalized {
                    continue;
                }
                if let Some(method) = existing.methods.overlap(&route.methods) {
                    return Err(ConfigError::DuplicateRoute {
                        route: route.name.clone(),
                        existing: existing.name.clone(),
                        method,
                        template: normalized,
                    });
                }
            }

            routes.push(Arc::new(route));
        }

        Ok(Self { routes, generation: 0 })
    }

    /// Routes in declaration order.
    pub fn routes(&self) -> &[Arc<RouteDefinition>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Monotonic version assigned when the table was published.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared, hot-swappable reference to the live route table.
#[derive(Debug)]
pub struct RouteTableHandle {
    current: ArcSwap<RouteTable>,
    next_generation: AtomicU64,
}

impl RouteTableHandle {
    /// Publish an initial table as generation 1.
    pub fn new(mut table: RouteTable) -> Self {
        table.generation = 1;
        Self {
            current: ArcSwap::from_pointee(table),
            next_generation: AtomicU64::new(2),
        }
    }

    /// Snapshot of the live table. Holding it keeps that table alive even
    /// if a reload publishes a newer one.
    pub fn load(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    /// Build a new table from `configs` and publish it. On error the live
    /// table is left untouched and the error is returned.
    pub fn reload(&self, configs: &[RouteConfig]) -> Result<Arc<RouteTable>, ConfigError> {
        let mut table = RouteTable::load(configs)?;
        table.generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let table = Arc::new(table);
        self.current.store(Arc::clone(&table));
        Ok(table)
    }
}
