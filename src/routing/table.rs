//! Route table keyed by (method, translated path).
//!
//! # Responsibilities
//! - Hold one binding per unique (method, pattern) pair
//! - Normalize method case before keying
//! - Iterate bindings grouped by pattern, or in declaration order
//!
//! # Design Decisions
//! - Later bindings silently replace earlier ones
//! - No conflict detection between overlapping patterns here; the HTTP
//!   front rejects patterns its router cannot hold

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::schema::FunctionDefinition;
use crate::integration::rules::ResponseRules;
use crate::routing::path::RoutePattern;

/// Method token that binds every otherwise unbound method on a path.
pub const ANY_METHOD: &str = "ANY";

/// Everything a mounted route needs to serve a request.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    /// Owning function.
    pub function: Arc<FunctionDefinition>,

    /// Upper-case method token (`GET`, `POST`, `ANY`, ...).
    pub method: String,

    /// Translated route.
    pub pattern: RoutePattern,

    /// Ordered response rules, already populated with stage variables.
    pub responses: ResponseRules,

    /// Declaration order, assigned when bound.
    pub order: usize,
}

impl RouteBinding {
    pub fn new(
        function: Arc<FunctionDefinition>,
        method: &str,
        pattern: RoutePattern,
        responses: ResponseRules,
    ) -> Self {
        Self {
            function,
            method: normalize_method(method),
            pattern,
            responses,
            order: 0,
        }
    }
}

/// Upper-case a method token.
pub fn normalize_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

/// The process-wide set of declared routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<RoutePattern, BTreeMap<String, Arc<RouteBinding>>>,
    declared: usize,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a route. Returns the binding it replaced, if any.
    pub fn bind(&mut self, mut binding: RouteBinding) -> Option<Arc<RouteBinding>> {
        binding.order = self.declared;
        self.declared += 1;

        let previous = self
            .routes
            .entry(binding.pattern.clone())
            .or_default()
            .insert(binding.method.clone(), Arc::new(binding));

        if let Some(prev) = &previous {
            tracing::debug!(
                method = %prev.method,
                path = %prev.pattern,
                function = %prev.function.name,
                "Route binding replaced"
            );
        }
        previous
    }

    /// Look up a binding by method (any case) and pattern.
    pub fn get(&self, method: &str, pattern: &RoutePattern) -> Option<&Arc<RouteBinding>> {
        self.routes
            .get(pattern)
            .and_then(|methods| methods.get(&normalize_method(method)))
    }

    /// Patterns with their method bindings.
    pub fn patterns(&self) -> impl Iterator<Item = (&RoutePattern, &BTreeMap<String, Arc<RouteBinding>>)> {
        self.routes.iter()
    }

    /// Every binding, in the order it was declared.
    pub fn bindings(&self) -> Vec<&Arc<RouteBinding>> {
        let mut bindings: Vec<_> = self.routes.values().flat_map(BTreeMap::values).collect();
        bindings.sort_by_key(|binding| binding.order);
        bindings
    }

    /// Number of (method, pattern) bindings.
    pub fn len(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
