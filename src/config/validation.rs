//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that each route's downstream target is well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Route collisions and template errors are owned by the route table,
//!   which runs the same checks on every reload

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    if config.timeouts.downstream_ms == 0 {
        errors.push(ValidationError::new("timeouts.downstream_ms", "must be > 0"));
    }
    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::new("timeouts.connect_ms", "must be > 0"));
    }

    if config.cache.enabled && config.cache.max_entries == 0 {
        errors.push(ValidationError::new("cache.max_entries", "must be > 0 when caching is enabled"));
    }
    if config.cache.enabled && config.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("cache.sweep_interval_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        let field = |name: &str| format!("routes[{}].{}", i, name);

        if route.downstream_host.trim().is_empty() {
            errors.push(ValidationError::new(field("downstream_host"), "must not be empty"));
        } else {
            let base = format!(
                "{}://{}:{}",
                route.downstream_scheme, route.downstream_host, route.downstream_port
            );
            match url::Url::parse(&base) {
                Ok(url) if url.host_str().is_some() => {}
                _ => errors.push(ValidationError::new(
                    field("downstream_host"),
                    format!("'{}' is not a valid downstream target", base),
                )),
            }
        }
        if route.downstream_port == 0 {
            errors.push(ValidationError::new(field("downstream_port"), "must be > 0"));
        }
        // Downstream connections are plaintext; TLS terminates at the edge.
        if !route.downstream_scheme.eq_ignore_ascii_case("http") {
            errors.push(ValidationError::new(
                field("downstream_scheme"),
                format!("unsupported scheme '{}', only 'http' is supported", route.downstream_scheme),
            ));
        }
        if route.timeout_ms == Some(0) {
            errors.push(ValidationError::new(field("timeout_ms"), "must be > 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn route(host: &str, port: u16) -> RouteConfig {
        RouteConfig {
            name: String::new(),
            upstream_path_template: "/orders".into(),
            upstream_http_methods: vec!["GET".into()],
            transport: "http".into(),
            downstream_scheme: "http".into(),
            downstream_host: host.into(),
            downstream_port: port,
            downstream_path_template: None,
            rpc_service: None,
            timeout_ms: None,
            cache: None,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.downstream_ms = 0;
        config.routes.push(route("", 0));

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"timeouts.downstream_ms"));
        assert!(fields.contains(&"routes[0].downstream_host"));
        assert!(fields.contains(&"routes[0].downstream_port"));
    }

    #[test]
    fn rejects_unknown_scheme() {
        let mut config = GatewayConfig::default();
        let mut r = route("orders.local", 8004);
        r.downstream_scheme = "ftp".into();
        config.routes.push(r);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "routes[0].downstream_scheme");
    }
}
