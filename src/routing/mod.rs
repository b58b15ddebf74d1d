//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     prefix + Endpoint.path
//!     → path.rs (translate "{id}" → ":id", normalize slashes)
//!     → table.rs (bind per (method, pattern), later wins)
//!     → http::server groups bindings by router shape and mounts each shape once
//!
//! Incoming Request:
//!     axum matches the mounted shape
//!     → RouteBinding (function, method, ordered response rules)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable once listening
//! - An endpoint that fails translation is skipped, never fatal
//! - Duplicate (method, path) bindings overwrite without complaint

pub mod path;
pub mod table;

pub use path::{normalize_prefix, parameter_index, translate, RoutePattern, RouteResolutionError};
pub use table::{RouteBinding, RouteTable};
