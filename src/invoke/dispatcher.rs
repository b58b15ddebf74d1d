//! Invocation dispatch.
//!
//! # Responsibilities
//! - Resolve the function's handler through the registry
//! - Run the handler on its own task so dispatch never blocks other requests
//! - Turn the first completion report into the invocation result
//!
//! # Design Decisions
//! - The receiver is dropped after the first report, so later reports
//!   from the same invocation are discarded without any locking
//! - A handler that ends without reporting (including a panic) still
//!   produces a failure; the client always gets a response
//! - Handlers are not cancelled once the result is taken

use std::sync::Arc;

use serde_json::Value;

use crate::config::schema::FunctionDefinition;
use crate::invoke::event::InvocationEvent;
use crate::invoke::handler::{Completion, Invocable, InvocationContext, InvocationResult};
use crate::invoke::registry::HandlerRegistry;

/// Failure reported when a handler never signals completion.
pub const EXITED_WITHOUT_COMPLETION: &str = "Process exited before completing request";

/// Run one invocation and wait for its first completion report.
pub async fn invoke(
    handler: Arc<dyn Invocable>,
    event: InvocationEvent,
    context: InvocationContext,
) -> InvocationResult {
    let (completion, mut rx) = Completion::channel();
    let function = context.function_name.clone();

    let task = tokio::spawn(async move {
        handler.invoke(event, context, completion).await;
    });

    if let Some(result) = rx.recv().await {
        return result;
    }

    if let Err(e) = task.await {
        if e.is_panic() {
            tracing::error!(function = %function, "Handler panicked before completing");
        }
    }
    tracing::warn!(function = %function, "Handler finished without completing");
    InvocationResult::Failure(Value::String(EXITED_WITHOUT_COMPLETION.to_string()))
}

/// Resolves and invokes function handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Invoke `function` with `event`. Load failures become `Failure(message)`.
    pub async fn dispatch(
        &self,
        function: &FunctionDefinition,
        event: InvocationEvent,
        request_id: String,
    ) -> InvocationResult {
        let handler = match self.registry.resolve(&function.runtime, &function.handler) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!(
                    function = %function.name,
                    handler = %function.handler,
                    error = %e,
                    "Handler resolution failed"
                );
                return InvocationResult::Failure(Value::String(e.to_string()));
            }
        };

        let context = InvocationContext {
            function_name: function.name.clone(),
            request_id,
        };
        invoke(handler, event, context).await
    }
}
