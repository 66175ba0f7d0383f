//! Option schemas and validation.
//!
//! Every concrete actor declares its options as a schema of
//! `(kind, default-or-required, help)` entries. Validation fills in
//! defaults, checks presence and runtime kinds, and reports every
//! violation it finds in one pass rather than stopping at the first.

use serde_json::{Map, Value};
use tracing::warn;

/// Declared kind of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Str,
    Number,
    List,
    Map,
    /// Any JSON value; no kind check.
    Any,
}

impl OptionKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Str => value.is_string(),
            Self::Number => value.is_number(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
            Self::Any => true,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Str => "string",
            Self::Number => "number",
            Self::List => "list",
            Self::Map => "map",
            Self::Any => "any",
        }
    }
}

/// Marks an option as mandatory or supplies its default.
#[derive(Debug, Clone)]
pub enum OptionDefault {
    /// The caller must supply a value.
    Required,

    /// Used when the caller omits the option.
    Value(Value),
}

/// One declared option: kind, default-or-required, help text, and an
/// optional custom validator that replaces the kind check.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    kind: OptionKind,
    default: OptionDefault,
    help: &'static str,
    validator: Option<fn(&Value) -> Result<(), String>>,
}

impl OptionSpec {
    /// A mandatory option.
    pub fn required(kind: OptionKind, help: &'static str) -> Self {
        Self {
            kind,
            default: OptionDefault::Required,
            help,
            validator: None,
        }
    }

    /// An option with a default.
    pub fn optional(kind: OptionKind, default: Value, help: &'static str) -> Self {
        Self {
            kind,
            default: OptionDefault::Value(default),
            help,
            validator: None,
        }
    }

    /// Replace the kind check with a custom validator.
    pub fn with_validator(mut self, validator: fn(&Value) -> Result<(), String>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// The declared kind.
    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    /// The help text.
    pub fn help(&self) -> &'static str {
        self.help
    }

    fn check(&self, name: &str, value: &Value, problems: &mut Vec<String>) {
        if let Some(validator) = self.validator {
            if let Err(reason) = validator(value) {
                problems.push(format!("option `{name}`: {reason}"));
            }
            return;
        }

        if !self.kind.matches(value) {
            problems.push(format!(
                "option `{name}` expects {}, got {}",
                self.kind.name(),
                kind_of(value)
            ));
        }
    }
}

/// Ordered schema of an actor's options. Declaration order is preserved;
/// ensurable actors reconcile properties in this order.
#[derive(Debug, Clone, Default)]
pub struct OptionSchema {
    entries: Vec<(&'static str, OptionSpec)>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option. Builder-style.
    pub fn option(mut self, name: &'static str, spec: OptionSpec) -> Self {
        self.entries.push((name, spec));
        self
    }

    /// Declared option names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Look up a declared option.
    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, spec)| spec)
    }

    /// Fill defaults and validate the supplied options in place.
    ///
    /// Returns every violation found: missing required options, kind
    /// mismatches, and custom-validator failures. Options not in the
    /// schema are tolerated with a warning, since scripts commonly carry
    /// annotations the actor does not consume.
    pub fn validate(&self, kind: &str, options: &mut Map<String, Value>) -> Vec<String> {
        let mut problems = Vec::new();

        for (name, spec) in &self.entries {
            match options.get(*name) {
                Some(value) => spec.check(name, value, &mut problems),
                None => match &spec.default {
                    OptionDefault::Required => {
                        problems.push(format!("option `{name}` is required ({})", spec.help));
                    }
                    OptionDefault::Value(default) => {
                        options.insert((*name).to_string(), default.clone());
                    }
                },
            }
        }

        for name in options.keys() {
            if self.get(name).is_none() {
                warn!(actor = kind, option = %name, "ignoring undeclared option");
            }
        }

        problems
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn schema() -> OptionSchema {
        OptionSchema::new()
            .option("name", OptionSpec::required(OptionKind::Str, "resource name"))
            .option(
                "count",
                OptionSpec::optional(OptionKind::Number, json!(1), "instance count"),
            )
            .option(
                "state",
                OptionSpec::optional(OptionKind::Str, json!("present"), "desired state")
                    .with_validator(|v| match v.as_str() {
                        Some("present") | Some("absent") => Ok(()),
                        _ => Err("must be `present` or `absent`".to_string()),
                    }),
            )
    }

    #[test]
    fn test_defaults_fill_in() {
        let mut options = json!({"name": "web"}).as_object().unwrap().clone();
        let problems = schema().validate("test", &mut options);
        assert!(problems.is_empty());
        assert_eq!(options["count"], json!(1));
        assert_eq!(options["state"], json!("present"));
    }

    #[test]
    fn test_every_violation_is_reported() {
        let mut options = json!({"count": "three"}).as_object().unwrap().clone();
        let problems = schema().validate("test", &mut options);

        // Missing required `name` and ill-typed `count`, both reported.
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("`name`"));
        assert!(problems[1].contains("`count`"));
    }

    #[test]
    fn test_custom_validator_replaces_kind_check() {
        let mut options = json!({"name": "web", "state": "paused"})
            .as_object()
            .unwrap()
            .clone();
        let problems = schema().validate("test", &mut options);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("present"));
    }

    #[test]
    fn test_undeclared_options_are_tolerated() {
        let mut options = json!({"name": "web", "comment": "ignore me"})
            .as_object()
            .unwrap()
            .clone();
        let problems = schema().validate("test", &mut options);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_declaration_order_is_preserved() {
        let names: Vec<_> = schema().names().collect();
        assert_eq!(names, vec!["name", "count", "state"]);
    }
}
