//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID / trace / body limit layers)
//!     → request.rs (buffer body, build GatewayRequest)
//!     → gateway::GatewayPipeline
//!     → response.rs (GatewayResponse → HTTP, x-gateway-cache)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{into_gateway_request, MakeRequestUuid};
pub use response::CACHE_STATUS_HEADER;
pub use server::{AppState, GatewayServer, ServerError};
