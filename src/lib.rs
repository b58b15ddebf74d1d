//! Local API Gateway simulator for serverless functions.
//!
//! Serves each declared function endpoint as an HTTP route, builds a flat
//! invocation event from the request, runs the function's handler and maps
//! its outcome to a status code and headers through ordered response rules.

pub mod config;
pub mod http;
pub mod integration;
pub mod invoke;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use http::Gateway;
pub use invoke::{HandlerRegistry, NativeModules, ProcessLoader};
pub use lifecycle::Shutdown;
