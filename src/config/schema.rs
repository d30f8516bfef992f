//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Route definitions, in declaration order. Order matters: the first
    /// route whose method and path template match a request wins.
    pub routes: Vec<RouteConfig>,

    /// Downstream timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8010").
    pub bind_address: String,

    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8010".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// A single route: upstream pattern to downstream target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics. Derived from the upstream
    /// methods and template when left empty.
    #[serde(default)]
    pub name: String,

    /// Upstream path template, e.g. "/Discount/{productName}".
    pub upstream_path_template: String,

    /// Accepted upstream methods. Empty means any method.
    #[serde(default)]
    pub upstream_http_methods: Vec<String>,

    /// Downstream transport kind: "http" or "grpc".
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Downstream scheme for HTTP transport.
    #[serde(default = "default_scheme")]
    pub downstream_scheme: String,

    /// Downstream host name or address.
    pub downstream_host: String,

    /// Downstream port.
    pub downstream_port: u16,

    /// Downstream path template. Placeholders are filled from the upstream
    /// match. When absent the normalized upstream path is forwarded as is.
    #[serde(default)]
    pub downstream_path_template: Option<String>,

    /// RPC service served at the downstream target (gRPC transport only).
    #[serde(default)]
    pub rpc_service: Option<String>,

    /// Per-route downstream timeout override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Optional response caching policy.
    #[serde(default)]
    pub cache: Option<RouteCacheConfig>,
}

fn default_transport() -> String {
    "http".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

/// Per-route caching policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteCacheConfig {
    /// Enable caching for this route.
    pub enabled: bool,

    /// Time-to-live in seconds. Zero disables caching.
    pub ttl_secs: u64,

    /// Cache region. Defaults to the route name.
    pub region: Option<String>,

    /// Query parameters that take part in the cache key. Empty means all.
    pub query_keys: Vec<String>,

    /// Request headers that take part in the cache key.
    pub header_keys: Vec<String>,
}

impl Default for RouteCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 0,
            region: None,
            query_keys: Vec::new(),
            header_keys: Vec::new(),
        }
    }
}

/// Timeout configuration for downstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Default bound on a whole downstream call in milliseconds.
    pub downstream_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            downstream_ms: 10_000,
        }
    }
}

/// Gateway-wide response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; when false no route is cached.
    pub enabled: bool,

    /// Maximum number of entries before LRU eviction kicks in.
    pub max_entries: usize,

    /// Interval of the background expiry sweep in seconds.
    pub sweep_interval_secs: u64,

    /// Responses larger than this are never cached.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            sweep_interval_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8011".to_string(),
        }
    }
}
