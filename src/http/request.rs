//! Request inputs for an invocation.
//!
//! # Responsibilities
//! - Read or generate the request ID
//! - Decode JSON bodies into event fields
//!
//! # Design Decisions
//! - Only JSON content types are decoded; other bodies contribute nothing
//! - An empty JSON body is an empty object
//! - Size limits are enforced by the body limit layer before this runs

use axum::{
    body::Bytes,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::invoke::event::body_fields;

pub const X_REQUEST_ID: &str = "x-request-id";

/// A request body that could not be decoded.
#[derive(Debug, Error)]
pub enum BodyRejection {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Rejected request body");
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// The caller's `x-request-id`, or a fresh UUID v4.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Whether the request declares a JSON body (`application/json` or `*/*+json`).
pub fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Event fields contributed by the body.
pub fn decode_json_body(headers: &HeaderMap, body: &Bytes) -> Result<Map<String, Value>, BodyRejection> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_slice(body)?;
    Ok(body_fields(value))
}
