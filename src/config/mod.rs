//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.<profile>.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → routing::RouteTable::load (route checks, compiled table)
//!
//! On reload (file change, SIGHUP, admin API):
//!     watcher.rs / signals / admin load the file
//!     → loader.rs + validation.rs
//!     → RouteTableHandle::reload (build aside, atomic swap)
//!     → old table stays live if anything fails
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the route table is hot-swapped; listener, cache and timeout
//!   settings take effect on restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, resolve_config_path, ConfigError, DEFAULT_PROFILE};
pub use schema::{
    AdminConfig, CacheConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RouteCacheConfig, RouteConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
