//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Profile used when none is given on the command line or environment.
pub const DEFAULT_PROFILE: &str = "Development";

/// Error type for configuration loading and route table construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Route '{route}' collides with route '{existing}' on {method} {template}")]
    DuplicateRoute {
        route: String,
        existing: String,
        method: String,
        template: String,
    },

    #[error("Route '{route}' uses unknown transport kind '{kind}'")]
    UnknownTransport { route: String, kind: String },

    #[error("Route '{route}' uses unknown RPC service '{service}'")]
    UnknownRpcService { route: String, service: String },

    #[error("Route '{route}' has invalid path template '{template}': {reason}")]
    InvalidTemplate {
        route: String,
        template: String,
        reason: String,
    },

    #[error("Route '{route}' has invalid HTTP method '{method}'")]
    InvalidMethod { route: String, method: String },

    #[error("Route '{route}' has invalid cache header key '{header}'")]
    InvalidCacheHeader { route: String, header: String },

    #[error("Route '{route}' does not support method {method} over {transport}")]
    UnsupportedMethod {
        route: String,
        method: String,
        transport: String,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the profile-specific configuration file, e.g.
/// `<dir>/gateway.Production.toml`.
pub fn resolve_config_path(dir: &Path, profile: &str) -> PathBuf {
    dir.join(format!("gateway.{}.toml", profile))
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}
