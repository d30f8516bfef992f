//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → template.rs (normalize path: decode escapes, strip trailing slash)
//!     → matcher.rs (scan routes in declaration order)
//!     → Return: RouteMatch or NoMatch
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → table.rs (compile templates, check collisions)
//!     → Freeze as immutable RouteTable
//!     → RouteTableHandle swaps it in atomically
//! ```
//!
//! # Design Decisions
//! - Routes compiled ahead of time, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by declaration)

pub mod matcher;
pub mod table;
pub mod template;

pub use matcher::{match_route, NoMatch, RouteMatch};
pub use table::{
    CachePolicy, DownstreamTarget, MethodFilter, RouteDefinition, RouteTable, RouteTableHandle,
    RpcService, TransportKind,
};
pub use template::{NormalizedPath, PathParams, PathTemplate};
