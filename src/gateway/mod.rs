//! Gateway pipeline.
//!
//! # Data Flow
//! ```text
//! GatewayRequest
//!     → Received
//!     → Matched        (routing::match_route; NoMatch → 404 → Responded)
//!     → CacheHit       → Responded
//!     | CacheMiss      → Dispatching → Succeeded (write-through) | Faulted → Responded
//! ```
//!
//! # Design Decisions
//! - Exactly one `GatewayResponse` per request, whichever path is taken
//! - Cache errors degrade to a miss or a skipped write, never a failure
//! - Only GET and HEAD responses with a 2xx status are cached

pub mod pipeline;
pub mod request;
pub mod stage;

pub use pipeline::GatewayPipeline;
pub use request::{CacheStatus, GatewayRequest, GatewayResponse, Outcome, REQUEST_ID_HEADER};
pub use stage::{Stage, StageTracker};
