//! Handler interaction shapes.
//!
//! # Responsibilities
//! - Define the tagged outcome every invocation converges on
//! - Provide the completion signal handed to every invocation
//! - Adapt direct-return and completion-signal handlers to one trait
//!
//! # Design Decisions
//! - `Invocable` is completion-shaped; direct-return handlers are adapted
//!   by reporting their returned value through the signal
//! - The signal is a channel sender: cloning it is cheap, only the first
//!   report is ever read, later reports fall on the floor

use std::future::Future;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::invoke::event::InvocationEvent;

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    /// The handler's returned or reported value.
    Success(Value),
    /// The raw error, unmodified.
    Failure(Value),
}

impl InvocationResult {
    /// Node-style `(error, value)` report. A null error counts as success.
    pub fn from_callback(error: Option<Value>, value: Option<Value>) -> Self {
        match error {
            Some(err) if !err.is_null() => Self::Failure(err),
            _ => Self::Success(value.unwrap_or(Value::Null)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error rendered for pattern matching; empty on success.
    pub fn error_string(&self) -> String {
        match self {
            Self::Success(_) => String::new(),
            Self::Failure(error) => stringify_error(error),
        }
    }

    /// Response body: the payload, or `{"errorMessage": <raw error>}`.
    pub fn into_body(self) -> Value {
        match self {
            Self::Success(payload) => payload,
            Self::Failure(error) => json!({ "errorMessage": error }),
        }
    }
}

impl From<Result<Value, Value>> for InvocationResult {
    fn from(outcome: Result<Value, Value>) -> Self {
        match outcome {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

/// Strings render as themselves, everything else as compact JSON.
pub fn stringify_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Per-invocation metadata handed to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub function_name: String,
    pub request_id: String,
}

/// Completion signal for one invocation.
#[derive(Debug, Clone)]
pub struct Completion {
    tx: mpsc::UnboundedSender<InvocationResult>,
}

impl Completion {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<InvocationResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report the outcome. Only the first report of an invocation is used.
    pub fn complete(&self, result: InvocationResult) {
        if self.tx.send(result).is_err() {
            tracing::debug!("Late completion discarded");
        }
    }

    pub fn succeed(&self, value: Value) {
        self.complete(InvocationResult::Success(value));
    }

    pub fn fail(&self, error: impl Into<Value>) {
        self.complete(InvocationResult::Failure(error.into()));
    }

    /// Node-style report.
    pub fn done(&self, error: Option<Value>, value: Option<Value>) {
        self.complete(InvocationResult::from_callback(error, value));
    }
}

/// Anything the dispatcher can invoke.
#[async_trait]
pub trait Invocable: Send + Sync {
    /// Run the handler. It must eventually report through `completion`,
    /// possibly after this future resolves.
    async fn invoke(&self, event: InvocationEvent, context: InvocationContext, completion: Completion);
}

/// Adapter for handlers that resolve to `Ok(value)` / `Err(error)`.
pub struct DirectReturn<F>(pub F);

#[async_trait]
impl<F, Fut> Invocable for DirectReturn<F>
where
    F: Fn(InvocationEvent, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    async fn invoke(&self, event: InvocationEvent, context: InvocationContext, completion: Completion) {
        let outcome = (self.0)(event, context).await;
        completion.complete(outcome.into());
    }
}

/// Adapter for handlers that report through the completion signal.
pub struct Callback<F>(pub F);

/// Wrap an async function returning `Result<Value, Value>`.
pub fn direct<F, Fut>(f: F) -> DirectReturn<F>
where
    F: Fn(InvocationEvent, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    DirectReturn(f)
}

/// Wrap an async function that reports through a [`Completion`].
pub fn callback<F, Fut>(f: F) -> Callback<F>
where
    F: Fn(InvocationEvent, InvocationContext, Completion) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    Callback(f)
}

#[async_trait]
impl<F, Fut> Invocable for Callback<F>
where
    F: Fn(InvocationEvent, InvocationContext, Completion) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn invoke(&self, event: InvocationEvent, context: InvocationContext, completion: Completion) {
        (self.0)(event, context, completion).await;
    }
}
