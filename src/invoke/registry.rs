//! Lazy handler resolution with memoization.
//!
//! # Responsibilities
//! - Route a locator to the loader registered for its runtime
//! - Cache resolved handlers for the process lifetime
//! - Surface resolution failures as typed errors
//!
//! # Design Decisions
//! - Failures are never cached; the next request retries the load
//! - Two concurrent first loads may both run; the later insert wins and
//!   both results are equivalent, so no lock is held across `load`

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::config::schema::{HandlerLocator, RuntimeKind};
use crate::invoke::handler::Invocable;

/// A handler locator that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerLoadError {
    #[error("no loader registered for runtime '{0}'")]
    UnsupportedRuntime(RuntimeKind),

    #[error("Cannot find module '{module}'")]
    ModuleNotFound { module: String },

    #[error("Module '{module}' has no export '{export}'")]
    ExportNotFound { module: String, export: String },
}

/// Resolves locators for one runtime kind.
pub trait HandlerLoader: Send + Sync {
    fn load(&self, locator: &HandlerLocator) -> Result<Arc<dyn Invocable>, HandlerLoadError>;
}

/// Locator → invocable cache in front of the per-runtime loaders.
#[derive(Default)]
pub struct HandlerRegistry {
    loaders: HashMap<RuntimeKind, Arc<dyn HandlerLoader>>,
    cache: DashMap<(RuntimeKind, HandlerLocator), Arc<dyn Invocable>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the loader for a runtime, replacing any previous one.
    pub fn with_loader(mut self, runtime: RuntimeKind, loader: impl HandlerLoader + 'static) -> Self {
        self.loaders.insert(runtime, Arc::new(loader));
        self
    }

    /// Whether functions of this runtime can be served.
    pub fn supports(&self, runtime: &RuntimeKind) -> bool {
        self.loaders.contains_key(runtime)
    }

    /// Resolve a handler, loading it on first use.
    pub fn resolve(
        &self,
        runtime: &RuntimeKind,
        locator: &HandlerLocator,
    ) -> Result<Arc<dyn Invocable>, HandlerLoadError> {
        let key = (runtime.clone(), locator.clone());
        if let Some(entry) = self.cache.get(&key) {
            return Ok(entry.value().clone());
        }

        let loader = self
            .loaders
            .get(runtime)
            .ok_or_else(|| HandlerLoadError::UnsupportedRuntime(runtime.clone()))?;

        let invocable = loader.load(locator)?;
        tracing::debug!(handler = %locator, runtime = %runtime, "Handler loaded");
        self.cache.insert(key, invocable.clone());
        Ok(invocable)
    }

    /// Number of cached handlers.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
