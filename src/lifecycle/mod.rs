//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     GET /__quit or Ctrl-C → trigger → stop accepting → drain in-flight → exit
//!
//! Signals (signals.rs):
//!     SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Graceful only: in-flight invocations are never aborted

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
