//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0)
//! - Check function names are present and unique
//! - Check endpoint methods are HTTP method tokens
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Route conflicts are not checked here; the server skips unroutable patterns

use std::collections::HashSet;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("function #{0} has an empty name")]
    EmptyFunctionName(usize),

    #[error("function '{0}' is defined more than once")]
    DuplicateFunction(String),

    #[error("server.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("function '{function}' has an endpoint with invalid method '{method}'")]
    InvalidMethod { function: String, method: String },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let mut seen = HashSet::new();
    for (index, function) in config.functions.iter().enumerate() {
        if function.name.trim().is_empty() {
            errors.push(ValidationError::EmptyFunctionName(index));
            continue;
        }
        if !seen.insert(function.name.as_str()) {
            errors.push(ValidationError::DuplicateFunction(function.name.clone()));
        }
        for endpoint in &function.endpoints {
            if Method::from_bytes(endpoint.method.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidMethod {
                    function: function.name.clone(),
                    method: endpoint.method.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
