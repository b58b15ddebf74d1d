//! Endpoint path template translation.
//!
//! # Responsibilities
//! - Join the global prefix and an endpoint path template
//! - Normalize slashes (one leading, no trailing except root)
//! - Turn `{name}` segments into `:name` parameters
//! - Render the pattern's shape in the HTTP router's own syntax
//!
//! # Design Decisions
//! - Partially braced segments (`v{1}`) are literals, not errors
//! - `{name+}` is the greedy proxy variable and must be last
//! - Internal empty segments are kept as declared

use std::fmt;

use thiserror::Error;

/// A declared endpoint that cannot be turned into a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteResolutionError {
    #[error("empty parameter name in path '{0}'")]
    EmptyParameter(String),

    #[error("greedy parameter '{name}' must be the last segment of '{path}'")]
    GreedyNotLast { name: String, path: String },

    #[error("literal segment '{segment}' in '{path}' is not routable")]
    UnroutableSegment { segment: String, path: String },

    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    #[error("route '{path}' rejected by the router: {reason}")]
    Rejected { path: String, reason: String },
}

/// One `/`-separated piece of a translated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Greedy(String),
}

/// A translated route such as `/users/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutePattern(String);

impl RoutePattern {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into segments. The leading empty segment is skipped.
    pub fn segments(&self) -> Vec<Segment> {
        if self.0 == "/" {
            return Vec::new();
        }
        self.0[1..]
            .split('/')
            .map(|part| match part.strip_prefix(':') {
                Some(name) => match name.strip_suffix('+') {
                    Some(greedy) => Segment::Greedy(greedy.to_string()),
                    None => Segment::Param(name.to_string()),
                },
                None => Segment::Literal(part.to_string()),
            })
            .collect()
    }

    /// Names of the path parameters, in declaration order.
    pub fn parameters(&self) -> Vec<String> {
        self.segments()
            .into_iter()
            .filter_map(|s| match s {
                Segment::Param(name) | Segment::Greedy(name) => Some(name),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Render in the router's syntax with positional placeholders
    /// (`{p0}`, `{*p1}`). Patterns that differ only in parameter names share
    /// one shape; [`parameter_index`] maps a placeholder back to its position.
    pub fn to_router_shape(&self) -> Result<String, RouteResolutionError> {
        let segments = self.segments();
        if segments.is_empty() {
            return Ok("/".to_string());
        }

        let mut out = String::with_capacity(self.0.len() + 4);
        let mut position = 0;
        for segment in segments {
            out.push('/');
            match segment {
                Segment::Param(_) => {
                    out.push_str(&format!("{{{}{}}}", PLACEHOLDER, position));
                    position += 1;
                }
                Segment::Greedy(_) => {
                    out.push_str(&format!("{{*{}{}}}", PLACEHOLDER, position));
                    position += 1;
                }
                Segment::Literal(text) => {
                    if text.starts_with('*') {
                        return Err(RouteResolutionError::UnroutableSegment {
                            segment: text,
                            path: self.0.clone(),
                        });
                    }
                    out.push_str(&text.replace('{', "{{").replace('}', "}}"));
                }
            }
        }
        Ok(out)
    }
}

const PLACEHOLDER: &str = "p";

/// Position of a router placeholder produced by [`RoutePattern::to_router_shape`].
pub fn parameter_index(placeholder: &str) -> Option<usize> {
    placeholder.strip_prefix(PLACEHOLDER)?.parse().ok()
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a configured prefix to end with exactly one slash (empty stays empty).
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }
    format!("{}/", prefix.trim_end_matches('/'))
}

/// Translate `prefix + path` into a route pattern.
pub fn translate(prefix: &str, path: &str) -> Result<RoutePattern, RouteResolutionError> {
    let joined = format!("{}{}", prefix, path);
    let trimmed = joined.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(RoutePattern("/".to_string()));
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    let last = parts.len() - 1;
    let mut out = String::with_capacity(trimmed.len() + 1);

    for (i, part) in parts.iter().enumerate() {
        out.push('/');
        let Some(name) = part
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        else {
            out.push_str(part);
            continue;
        };

        let bare = name.strip_suffix('+').unwrap_or(name);
        if bare.is_empty() {
            return Err(RouteResolutionError::EmptyParameter(joined));
        }
        if name.ends_with('+') && i != last {
            return Err(RouteResolutionError::GreedyNotLast {
                name: bare.to_string(),
                path: joined,
            });
        }
        out.push(':');
        out.push_str(name);
    }

    Ok(RoutePattern(out))
}
