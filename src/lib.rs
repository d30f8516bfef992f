//! Edge gateway: route matching, response caching and HTTP / gRPC dispatch
//! in front of the discount and ordering services.

pub mod admin;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use gateway::GatewayPipeline;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
