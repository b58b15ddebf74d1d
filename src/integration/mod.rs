//! Integration response mapping.
//!
//! # Data Flow
//! ```text
//! InvocationResult (Success | Failure)
//!     → selector.rs (ordered first-match over ResponseRules)
//!     → SelectedRule (status, headers)
//!     → http::response writes the HTTP response
//! ```
//!
//! # Design Decisions
//! - Rules are an ordered sequence, never a map keyed by name
//! - Patterns are compiled once when the configuration is loaded

pub mod rules;
pub mod selector;

pub use rules::{ResponseRule, ResponseRules, SelectionPattern, DEFAULT_RULE};
pub use selector::{match_error, select, SelectedRule};
