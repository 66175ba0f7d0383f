//! `{KEY}` token substitution.
//!
//! Descriptions, run conditions, and option values may carry `{KEY}`
//! placeholders, resolved at construction time against the actor's
//! init-context (typically environment variables plus group-supplied
//! context). Substitution walks the option value tree and touches only
//! string leaves, so substitution syntax inside structured values can
//! never collide with serialization.
//!
//! In strict mode an unresolved token is a hard failure, reported before
//! any side effect; non-strict mode leaves the placeholder in place for
//! an outer layer to resolve later.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Tokens that could not be resolved, deduplicated and sorted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unresolved tokens: {}", .0.join(", "))]
pub struct UnresolvedTokens(pub Vec<String>);

/// Substitution context: token name → replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    entries: BTreeMap<String, String>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a map from the process environment.
    pub fn from_env() -> Self {
        Self {
            entries: std::env::vars().collect(),
        }
    }

    /// Insert or replace a token.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a token.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// A copy of this map with `overlay` merged on top; overlay entries
    /// win on conflict.
    pub fn merged(&self, overlay: &TokenMap) -> TokenMap {
        let mut entries = self.entries.clone();
        entries.extend(overlay.entries.clone());
        TokenMap { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TokenMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Substitute `{KEY}` placeholders in a string.
///
/// In strict mode every unresolved token is collected and returned as an
/// error; otherwise unresolved placeholders stay in the output verbatim.
pub fn substitute(input: &str, tokens: &TokenMap, strict: bool) -> Result<String, UnresolvedTokens> {
    let mut missing = Vec::new();
    let output = substitute_into(input, tokens, &mut missing);
    finish(output, missing, strict)
}

/// Substitute `{KEY}` placeholders in every string leaf of a JSON value.
pub fn substitute_value(
    value: &Value,
    tokens: &TokenMap,
    strict: bool,
) -> Result<Value, UnresolvedTokens> {
    let mut missing = Vec::new();
    let output = walk(value, tokens, &mut missing);
    finish(output, missing, strict)
}

fn finish<T>(output: T, mut missing: Vec<String>, strict: bool) -> Result<T, UnresolvedTokens> {
    if strict && !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(UnresolvedTokens(missing));
    }
    Ok(output)
}

fn walk(value: &Value, tokens: &TokenMap, missing: &mut Vec<String>) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_into(s, tokens, missing)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| walk(v, tokens, missing)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), walk(v, tokens, missing)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Lenient single-pass scanner. A placeholder is `{` + one or more
/// `[A-Za-z0-9_]` characters + `}`; anything else (including `{}` and
/// braces around non-identifier text) passes through untouched.
fn substitute_into(input: &str, tokens: &TokenMap, missing: &mut Vec<String>) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('}') {
            Some(close) if close > 0 && is_token_name(&after_open[..close]) => {
                let name = &after_open[..close];
                match tokens.get(name) {
                    Some(replacement) => output.push_str(replacement),
                    None => {
                        missing.push(name.to_string());
                        output.push('{');
                        output.push_str(name);
                        output.push('}');
                    }
                }
                rest = &after_open[close + 1..];
            }
            _ => {
                output.push('{');
                rest = after_open;
            }
        }
    }

    output.push_str(rest);
    output
}

fn is_token_name(candidate: &str) -> bool {
    candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
