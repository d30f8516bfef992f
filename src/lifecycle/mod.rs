//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → listeners stop accepting and drain,
//!     background tasks exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Re-read config file → reload channel
//! ```
//!
//! # Design Decisions
//! - Startup is fail fast: any configuration error is fatal
//! - A second termination signal forces exit

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::handle_signals;
