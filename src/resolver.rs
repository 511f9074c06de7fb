//! Path resolution for conditional requirements
//!
//! A [`PathResolver`] is a registry of named root values scoped to one
//! validation pass. It is passed explicitly into every `validate` call and
//! must not be shared between concurrent validations.
//!
//! Query syntax: dot-separated segments, `$` for the root and `at(n)` for a
//! collection index, e.g. `$.order.items.at(0).sku`. Paths that do not start
//! with `$` are relative to the supplied prefix.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{Result, SchemaError};
use crate::path::ROOT;
use crate::value::Value;

const SEPARATOR: char = '.';

pub type PredicateFn = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// Test applied to the value found at a conditional path
#[derive(Clone)]
pub enum Predicate {
    Str(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Pattern(Regex),
    Func(PredicateFn),
}

impl Predicate {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Predicate::Func(Arc::new(f))
    }

    /// Scalars map to equality checks, `{"pattern": "..."}` to a regex match.
    /// Any other shape is a configuration error.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Predicate::Str(s.clone())),
            serde_json::Value::Bool(b) => Ok(Predicate::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Predicate::Integer(i)),
                None => Ok(Predicate::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            serde_json::Value::Object(map) if map.len() == 1 && map.contains_key("pattern") => {
                let pattern = map["pattern"].as_str().ok_or_else(|| {
                    SchemaError::Resolver(format!("pattern must be a string: {}", value))
                })?;
                let regex = Regex::new(pattern)
                    .map_err(|e| SchemaError::Resolver(format!("invalid pattern {}: {}", pattern, e)))?;
                Ok(Predicate::Pattern(regex))
            }
            other => Err(SchemaError::Resolver(format!(
                "predicate not supported: {}",
                other
            ))),
        }
    }

    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Func(f) => f(value),
            Predicate::Str(expected) => matches!(value, Some(Value::String(s)) if s == expected),
            Predicate::Bool(expected) => matches!(value, Some(Value::Bool(b)) if b == expected),
            Predicate::Integer(expected) => {
                value.and_then(Value::as_f64) == Some(*expected as f64)
            }
            Predicate::Float(expected) => value.and_then(Value::as_f64) == Some(*expected),
            Predicate::Pattern(regex) => matches!(value, Some(Value::String(s)) if regex.is_match(s)),
        }
    }

    pub fn describe(&self) -> serde_json::Value {
        match self {
            Predicate::Str(s) => serde_json::Value::String(s.clone()),
            Predicate::Integer(i) => serde_json::Value::from(*i),
            Predicate::Float(f) => serde_json::Value::from(*f),
            Predicate::Bool(b) => serde_json::Value::Bool(*b),
            Predicate::Pattern(regex) => serde_json::json!({ "pattern": regex.as_str() }),
            Predicate::Func(_) => serde_json::Value::String("<function>".to_string()),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Func(_) => f.write_str("Func(..)"),
            Predicate::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            other => write!(f, "{}", other.describe()),
        }
    }
}

/// Registry of root values for one evaluation scope
///
/// `$` is the scope itself. Its children are the registered names plus the
/// fields of the value under validation; registered names shadow fields.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    root: Option<Value>,
    roots: BTreeMap<String, Value>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver whose `$.x` lookups fall through to the fields of `value`
    pub fn for_root(value: Value) -> Self {
        Self {
            root: Some(value),
            roots: BTreeMap::new(),
        }
    }

    /// Register a top-level value; dotted names are rejected and `$`
    /// replaces the value under validation
    pub fn register(&mut self, name: &str, value: Value) -> Result<()> {
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(SchemaError::Resolver(format!(
                "can only register top-level names, got {:?}",
                name
            )));
        }
        if name == ROOT {
            self.root = Some(value);
        } else {
            self.roots.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Walk `path` against the registered values; any missing segment yields `None`
    pub fn query(&self, path: &str, prefix: &str) -> Option<Value> {
        let full = if path.starts_with(ROOT) {
            path.to_string()
        } else {
            format!("{}{}{}", prefix, SEPARATOR, path)
        };

        let mut segments = full.split(SEPARATOR);
        if segments.next()? != ROOT {
            return None;
        }

        let mut current = match segments.next() {
            None => self.root.clone()?,
            Some(first) => match self.roots.get(first) {
                Some(registered) => registered.clone(),
                None => step(self.root.as_ref()?, first)?,
            },
        };

        for segment in segments {
            if current.is_null() {
                return None;
            }
            current = step(&current, segment)?;
        }

        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// Evaluate a conditional requirement against the scope
    pub fn check(&self, prefix: &str, path: &str, predicate: Option<&Predicate>) -> bool {
        let value = self.query(path, prefix);
        match predicate {
            None => value.is_some(),
            Some(predicate) => predicate.matches(value.as_ref()),
        }
    }
}

fn step(value: &Value, segment: &str) -> Option<Value> {
    match collection_index(segment) {
        Some(index) => value.at(index),
        None => value.get(segment),
    }
}

fn collection_index(segment: &str) -> Option<usize> {
    segment
        .strip_prefix("at(")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|index| index.parse().ok())
}
