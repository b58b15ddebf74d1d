//! Response construction from a selected rule.
//!
//! # Responsibilities
//! - Apply the rule's status code and headers
//! - Serialize the success payload or the `errorMessage` wrapper as JSON
//!
//! # Design Decisions
//! - A rule that cannot be expressed as HTTP yields a bare 500, the
//!   handler output is not sent

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::integration::rules::ResponseRule;
use crate::invoke::handler::InvocationResult;

/// A resolved rule that cannot be turned into an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchInternalError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String),
}

impl IntoResponse for DispatchInternalError {
    fn into_response(self) -> Response {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Build the HTTP response for `result` under `rule`.
pub fn render(rule: &ResponseRule, result: InvocationResult) -> Result<Response, DispatchInternalError> {
    let status = StatusCode::from_u16(rule.status_code)
        .map_err(|_| DispatchInternalError::InvalidStatus(rule.status_code))?;

    let mut headers = Vec::with_capacity(rule.headers.len());
    for (name, value) in &rule.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| DispatchInternalError::InvalidHeaderName(name.clone()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| DispatchInternalError::InvalidHeaderValue(name.clone()))?;
        headers.push((header_name, header_value));
    }

    let mut response = (status, Json(result.into_body())).into_response();
    for (name, value) in headers {
        response.headers_mut().insert(name, value);
    }
    Ok(response)
}
