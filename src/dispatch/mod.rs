//! Downstream dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! RouteMatch + inbound request
//!     → envelope.rs (DownstreamRequest: path rewrite, hop-by-hop strip)
//!     → Dispatcher (pick transport by route, enforce timeout)
//!         → http.rs  (HttpForwarder: hyper client, status 1:1)
//!         → rpc.rs   (RpcTranslator: HTTP shape ↔ discount gRPC calls)
//!     → DownstreamResponse | Fault (with route + target context)
//! ```
//!
//! # Design Decisions
//! - Transports are trait objects keyed by `TransportKind`; a new transport
//!   is a new variant plus an implementation, the pipeline does not change
//! - Every call runs under `tokio::time::timeout`; on expiry the call future
//!   is dropped, which cancels the in-flight request
//! - Single attempt, fail fast. Retries belong to an outer policy layer.

pub mod discount;
pub mod envelope;
pub mod fault;
pub mod http;
pub mod rpc;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::routing::{RouteDefinition, TransportKind};

pub use envelope::{strip_hop_by_hop, DownstreamRequest, DownstreamResponse};
pub use fault::{Fault, FaultKind};
pub use http::HttpForwarder;
pub use rpc::RpcTranslator;

/// A downstream transport capability.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one call. `timeout` is the bound the dispatcher enforces; a
    /// transport may propagate it (e.g. as a gRPC deadline).
    async fn call(
        &self,
        route: &RouteDefinition,
        request: DownstreamRequest,
        timeout: Duration,
    ) -> Result<DownstreamResponse, Fault>;
}

/// Routes calls to the transport registered for each route's kind.
#[derive(Clone)]
pub struct Dispatcher {
    transports: HashMap<TransportKind, Arc<dyn Transport>>,
    default_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with no transports registered.
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            transports: HashMap::new(),
            default_timeout,
        }
    }

    /// Register (or replace) the transport for a kind.
    pub fn with_transport(mut self, kind: TransportKind, transport: Arc<dyn Transport>) -> Self {
        self.transports.insert(kind, transport);
        self
    }

    /// Effective timeout for a route.
    pub fn timeout_for(&self, route: &RouteDefinition) -> Duration {
        route.timeout.unwrap_or(self.default_timeout)
    }

    /// Dispatch a request to the route's downstream.
    pub async fn dispatch(
        &self,
        route: &RouteDefinition,
        request: DownstreamRequest,
    ) -> Result<DownstreamResponse, Fault> {
        let transport = self.transports.get(&route.transport).ok_or_else(|| {
            Fault::internal(format!("no transport registered for '{}'", route.transport)).with_route(route)
        })?;

        let limit = self.timeout_for(route);
        match tokio::time::timeout(limit, transport.call(route, request, limit)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(fault)) => Err(fault.with_route(route)),
            Err(_) => Err(Fault::timeout(format!("no response within {} ms", limit.as_millis())).with_route(route)),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transports", &self.transports.keys().collect::<Vec<_>>())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}
