//! Response rule definitions.
//!
//! An endpoint's rules are an ordered list of `(name, rule)` pairs. Exactly
//! one is named `default`. The order is the declaration order in the
//! configuration document and selection depends on it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use regex::Regex;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the mandatory fallback rule.
pub const DEFAULT_RULE: &str = "default";

/// Errors building a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("response rules must contain a 'default' rule")]
    MissingDefault,

    #[error("duplicate response rule '{0}'")]
    Duplicate(String),
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Literal,
}

/// A pattern matched against a stringified handler error.
#[derive(Debug, Clone)]
pub struct SelectionPattern {
    source: String,
    matcher: Matcher,
}

impl SelectionPattern {
    /// Compile a pattern. Invalid regular expressions fall back to substring matching.
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let matcher = match Regex::new(&source) {
            Ok(re) => Matcher::Regex(re),
            Err(e) => {
                tracing::warn!(
                    pattern = %source,
                    error = %e,
                    "Selection pattern is not a valid regex, matching as literal text"
                );
                Matcher::Literal
            }
        };
        Self { source, matcher }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, error: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(error),
            Matcher::Literal => error.contains(&self.source),
        }
    }
}

impl PartialEq for SelectionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for SelectionPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Status code, headers and optional selection pattern for one outcome.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResponseRule {
    /// HTTP status. Accepts `200` or `"200"`.
    #[serde(alias = "statusCode", deserialize_with = "de_status_code")]
    pub status_code: u16,

    /// Headers written on the response.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Pattern tested against the stringified error. Empty means none.
    #[serde(
        default,
        alias = "selectionPattern",
        deserialize_with = "de_selection_pattern",
        skip_serializing_if = "Option::is_none"
    )]
    pub selection_pattern: Option<SelectionPattern>,
}

impl ResponseRule {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            selection_pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.selection_pattern = Some(SelectionPattern::new(pattern));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    fn populate(&self, vars: &HashMap<String, String>) -> Self {
        Self {
            status_code: self.status_code,
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), populate_template(v, vars)))
                .collect(),
            selection_pattern: self
                .selection_pattern
                .as_ref()
                .map(|p| SelectionPattern::new(populate_template(p.as_str(), vars))),
        }
    }
}

/// An endpoint's ordered rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRules {
    rules: Vec<(String, ResponseRule)>,
    default_index: usize,
}

impl ResponseRules {
    /// Build from declaration-ordered pairs.
    pub fn new(rules: Vec<(String, ResponseRule)>) -> Result<Self, RulesError> {
        let mut default_index = None;
        for (i, (name, _)) in rules.iter().enumerate() {
            if rules[..i].iter().any(|(seen, _)| seen == name) {
                return Err(RulesError::Duplicate(name.clone()));
            }
            if name == DEFAULT_RULE {
                default_index = Some(i);
            }
        }
        let default_index = default_index.ok_or(RulesError::MissingDefault)?;
        Ok(Self {
            rules,
            default_index,
        })
    }

    /// The `default` rule.
    pub fn default_rule(&self) -> &ResponseRule {
        &self.rules[self.default_index].1
    }

    /// Rules in declaration order, `default` included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResponseRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Substitute `${name}` placeholders in header values and selection patterns.
    pub fn populate(&self, vars: &HashMap<String, String>) -> Self {
        Self {
            rules: self
                .rules
                .iter()
                .map(|(name, rule)| (name.clone(), rule.populate(vars)))
                .collect(),
            default_index: self.default_index,
        }
    }
}

impl Default for ResponseRules {
    fn default() -> Self {
        Self {
            rules: vec![(DEFAULT_RULE.to_string(), ResponseRule::new(200))],
            default_index: 0,
        }
    }
}

impl<'de> Deserialize<'de> for ResponseRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RulesVisitor;

        impl<'de> Visitor<'de> for RulesVisitor {
            type Value = ResponseRules;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of response rule name to rule")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut rules = Vec::with_capacity(map.size_hint().unwrap_or(2));
                while let Some((name, rule)) = map.next_entry::<String, ResponseRule>()? {
                    rules.push((name, rule));
                }
                ResponseRules::new(rules).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(RulesVisitor)
    }
}

impl Serialize for ResponseRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for (name, rule) in &self.rules {
            map.serialize_entry(name, rule)?;
        }
        map.end()
    }
}

/// Replace `${name}` placeholders found in `vars`. Unknown names are left untouched.
pub fn populate_template(input: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn de_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    struct V;

    impl<'de> Visitor<'de> for V {
        type Value = u16;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a status code as an integer or a string containing an integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("status code {v} out of range")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u16::try_from(v).map_err(|_| E::custom(format!("status code {v} out of range")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.trim()
                .parse::<u16>()
                .map_err(|_| E::custom(format!("invalid status code '{v}'")))
        }
    }

    deserializer.deserialize_any(V)
}

fn de_selection_pattern<'de, D>(deserializer: D) -> Result<Option<SelectionPattern>, D::Error>
where
    D: Deserializer<'de>,
{
    let source = Option::<String>::deserialize(deserializer)?;
    Ok(source
        .filter(|s| !s.is_empty())
        .map(SelectionPattern::new))
}
