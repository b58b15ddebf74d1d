//! In-process handler modules registered through the library API.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::HandlerLocator;
use crate::invoke::handler::Invocable;
use crate::invoke::registry::{HandlerLoadError, HandlerLoader};

/// Module → export → handler table for the `native` runtime.
#[derive(Default, Clone)]
pub struct NativeModules {
    modules: HashMap<String, HashMap<String, Arc<dyn Invocable>>>,
}

impl NativeModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module.symbol`.
    pub fn export(mut self, module: &str, symbol: &str, handler: impl Invocable + 'static) -> Self {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(symbol.to_string(), Arc::new(handler));
        self
    }
}

impl HandlerLoader for NativeModules {
    fn load(&self, locator: &HandlerLocator) -> Result<Arc<dyn Invocable>, HandlerLoadError> {
        let exports = self
            .modules
            .get(&locator.module)
            .ok_or_else(|| HandlerLoadError::ModuleNotFound {
                module: locator.module.clone(),
            })?;

        exports
            .get(&locator.export)
            .cloned()
            .ok_or_else(|| HandlerLoadError::ExportNotFound {
                module: locator.module.clone(),
                export: locator.export.clone(),
            })
    }
}
