//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one route per (method, pattern))
//!     → cors.rs (OPTIONS short-circuit, allow-origin header)
//!     → request.rs (request ID, JSON body decoding)
//!     → [invoke::Dispatcher runs the handler]
//!     → [integration::select picks the response rule]
//!     → response.rs (status, headers, JSON body)
//!     → Send to client
//! ```

pub mod cors;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::DispatchInternalError;
pub use server::{Gateway, HandlerMap, InitHook, QUIT_PATH};
