//! Response rule selection.
//!
//! # Design Decisions
//! - Success always maps to `default`; patterns are never consulted
//! - Failures walk rules in declaration order and stop at the first match
//! - `default` is skipped during the walk and used when nothing matches

use crate::integration::rules::{ResponseRule, ResponseRules, DEFAULT_RULE};
use crate::invoke::InvocationResult;

/// The rule chosen for an outcome, with its name for logging and metrics.
#[derive(Debug, Clone, Copy)]
pub struct SelectedRule<'a> {
    pub name: &'a str,
    pub rule: &'a ResponseRule,
}

/// Select the rule for an invocation outcome.
pub fn select<'a>(rules: &'a ResponseRules, result: &InvocationResult) -> SelectedRule<'a> {
    match result {
        InvocationResult::Success(_) => default_of(rules),
        InvocationResult::Failure(_) => match_error(rules, &result.error_string()),
    }
}

/// First non-default rule whose pattern matches `error`, else `default`.
pub fn match_error<'a>(rules: &'a ResponseRules, error: &str) -> SelectedRule<'a> {
    rules
        .iter()
        .filter(|(name, _)| *name != DEFAULT_RULE)
        .find(|(_, rule)| {
            rule.selection_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(error))
        })
        .map(|(name, rule)| SelectedRule { name, rule })
        .unwrap_or_else(|| default_of(rules))
}

fn default_of(rules: &ResponseRules) -> SelectedRule<'_> {
    SelectedRule {
        name: DEFAULT_RULE,
        rule: rules.default_rule(),
    }
}
