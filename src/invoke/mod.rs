//! Handler invocation subsystem.
//!
//! # Data Flow
//! ```text
//! body + path params + query
//!     → event.rs (flat InvocationEvent)
//!     → dispatcher.rs
//!         → registry.rs (resolve locator, cached)
//!             → native.rs | process.rs (per-runtime loaders)
//!         → handler.rs (Invocable + Completion)
//!     → InvocationResult (Success | Failure)
//! ```
//!
//! # Design Decisions
//! - Handlers are loaded lazily on first request, never at startup
//! - Direct-return and completion-signal handlers share one trait
//! - At most one result per invocation

pub mod dispatcher;
pub mod event;
pub mod handler;
pub mod native;
pub mod process;
pub mod registry;

pub use dispatcher::{invoke, Dispatcher, EXITED_WITHOUT_COMPLETION};
pub use event::{build_event, InvocationEvent};
pub use handler::{
    callback, direct, Callback, Completion, DirectReturn, Invocable, InvocationContext,
    InvocationResult,
};
pub use native::NativeModules;
pub use process::ProcessLoader;
pub use registry::{HandlerLoadError, HandlerLoader, HandlerRegistry};
