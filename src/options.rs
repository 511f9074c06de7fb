//! Attribute options
//!
//! Options are a closed set: `required`, `null`, `default`, `values`,
//! `description`, `example`, `required_if`, `custom_data`. Anything else is
//! a type-specific option and must be accepted by the attribute's type
//! (see [`crate::types::Type::check_option`]).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::example::ExampleContext;
use crate::path::ValuePath;
use crate::record::Record;
use crate::resolver::Predicate;
use crate::value::Value;

/// Deferred default: receives the partially built parent and the field path
pub type DefaultFn = Arc<dyn Fn(Option<&Record>, &ValuePath) -> Value + Send + Sync>;

/// Deferred example: receives the field path and the generation context
pub type ExampleFn = Arc<dyn Fn(&ValuePath, &mut ExampleContext) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum DefaultValue {
    Static(Value),
    Generator(DefaultFn),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

#[derive(Clone)]
pub enum ExampleSpec {
    Static(Value),
    Generator(ExampleFn),
}

impl fmt::Debug for ExampleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExampleSpec::Static(value) => f.debug_tuple("Static").field(value).finish(),
            ExampleSpec::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// `required_if` condition: the field is required when the value found at
/// `path` (relative to the parent record) satisfies `predicate`, or merely
/// exists when there is no predicate.
#[derive(Debug, Clone)]
pub struct Condition {
    pub path: String,
    pub predicate: Option<Predicate>,
}

impl Condition {
    pub fn present(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            predicate: None,
        }
    }

    pub fn matching(path: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            path: path.into(),
            predicate: Some(predicate),
        }
    }

    /// Either a bare path string, or a single-entry object `{path: predicate}`
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(path) => Ok(Self::present(path.clone())),
            serde_json::Value::Object(map) if map.len() == 1 => {
                let (path, predicate) = map
                    .iter()
                    .next()
                    .ok_or_else(|| SchemaError::invalid_option("required_if", "empty condition"))?;
                Ok(Self::matching(path.clone(), Predicate::from_json(predicate)?))
            }
            other => Err(SchemaError::invalid_option(
                "required_if",
                format!("expected a path or a single {{path: predicate}} entry, got {}", other),
            )),
        }
    }

    pub fn describe(&self) -> serde_json::Value {
        match &self.predicate {
            None => serde_json::Value::String(self.path.clone()),
            Some(predicate) => {
                let mut map = serde_json::Map::new();
                map.insert(self.path.clone(), predicate.describe());
                serde_json::Value::Object(map)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    required: Option<bool>,
    nullable: Option<bool>,
    default: Option<DefaultValue>,
    values: Option<Vec<Value>>,
    description: Option<String>,
    example: Option<ExampleSpec>,
    required_if: Option<Condition>,
    custom_data: BTreeMap<String, serde_json::Value>,
    type_options: BTreeMap<String, serde_json::Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    pub fn with_default_fn<F>(mut self, generator: F) -> Self
    where
        F: Fn(Option<&Record>, &ValuePath) -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generator(Arc::new(generator)));
        self
    }

    pub fn values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn example(mut self, value: impl Into<Value>) -> Self {
        self.example = Some(ExampleSpec::Static(value.into()));
        self
    }

    pub fn example_with<F>(mut self, generator: F) -> Self
    where
        F: Fn(&ValuePath, &mut ExampleContext) -> Value + Send + Sync + 'static,
    {
        self.example = Some(ExampleSpec::Generator(Arc::new(generator)));
        self
    }

    pub fn required_if(mut self, condition: Condition) -> Self {
        self.required_if = Some(condition);
        self
    }

    pub fn custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_data.insert(key.into(), value);
        self
    }

    /// Type-specific option such as `min`, `max` or `regexp`
    pub fn option(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.type_options.insert(name.into(), value);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn explicit_nullable(&self) -> Option<bool> {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn allowed_values(&self) -> Option<&[Value]> {
        self.values.as_deref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn example_spec(&self) -> Option<&ExampleSpec> {
        self.example.as_ref()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.required_if.as_ref()
    }

    pub fn custom_data(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.custom_data
    }

    pub fn type_option(&self, name: &str) -> Option<&serde_json::Value> {
        self.type_options.get(name)
    }

    pub fn type_options(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.type_options
    }

    pub(crate) fn set_default(&mut self, default: Option<DefaultValue>) {
        self.default = default;
    }

    pub(crate) fn set_values(&mut self, values: Option<Vec<Value>>) {
        self.values = values;
    }

    /// Layer `overrides` on top of these options; explicit overrides win
    pub fn merged_with(&self, overrides: &Options) -> Options {
        let mut custom_data = self.custom_data.clone();
        custom_data.extend(overrides.custom_data.clone());
        let mut type_options = self.type_options.clone();
        type_options.extend(overrides.type_options.clone());

        Options {
            required: overrides.required.or(self.required),
            nullable: overrides.nullable.or(self.nullable),
            default: overrides.default.clone().or_else(|| self.default.clone()),
            values: overrides.values.clone().or_else(|| self.values.clone()),
            description: overrides
                .description
                .clone()
                .or_else(|| self.description.clone()),
            example: overrides.example.clone().or_else(|| self.example.clone()),
            required_if: overrides
                .required_if
                .clone()
                .or_else(|| self.required_if.clone()),
            custom_data,
            type_options,
        }
    }

    /// Parse options from a JSON object, rejecting mistyped known options
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut options = Options::new();
        for (name, value) in map {
            match name.as_str() {
                "required" => options.required = Some(expect_bool(name, value)?),
                "null" => options.nullable = Some(expect_bool(name, value)?),
                "default" => options.default = Some(DefaultValue::Static(Value::from(value.clone()))),
                "values" => match value {
                    serde_json::Value::Array(items) => {
                        options.values =
                            Some(items.iter().cloned().map(Value::from).collect());
                    }
                    other => {
                        return Err(SchemaError::invalid_option(
                            name,
                            format!("must be a list, got {}", other),
                        ))
                    }
                },
                "description" => match value {
                    serde_json::Value::String(text) => options.description = Some(text.clone()),
                    other => {
                        return Err(SchemaError::invalid_option(
                            name,
                            format!("must be a string, got {}", other),
                        ))
                    }
                },
                "example" => options.example = Some(ExampleSpec::Static(Value::from(value.clone()))),
                "required_if" => options.required_if = Some(Condition::from_json(value)?),
                "custom_data" => match value {
                    serde_json::Value::Object(entries) => {
                        options.custom_data =
                            entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    }
                    other => {
                        return Err(SchemaError::invalid_option(
                            name,
                            format!("must be an object, got {}", other),
                        ))
                    }
                },
                _ => {
                    options.type_options.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(options)
    }

    /// Plain-data rendering for `describe`
    pub fn describe(&self) -> BTreeMap<String, serde_json::Value> {
        let mut out = BTreeMap::new();
        if let Some(required) = self.required {
            out.insert("required".to_string(), serde_json::Value::Bool(required));
        }
        if let Some(nullable) = self.nullable {
            out.insert("null".to_string(), serde_json::Value::Bool(nullable));
        }
        if let Some(DefaultValue::Static(value)) = &self.default {
            out.insert("default".to_string(), value.to_json());
        }
        if let Some(values) = &self.values {
            out.insert(
                "values".to_string(),
                serde_json::Value::Array(values.iter().map(Value::to_json).collect()),
            );
        }
        if let Some(description) = &self.description {
            out.insert(
                "description".to_string(),
                serde_json::Value::String(description.clone()),
            );
        }
        if let Some(condition) = &self.required_if {
            out.insert("required_if".to_string(), condition.describe());
        }
        if !self.custom_data.is_empty() {
            out.insert(
                "custom_data".to_string(),
                serde_json::Value::Object(
                    self.custom_data
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                ),
            );
        }
        for (name, value) in &self.type_options {
            out.insert(name.clone(), value.clone());
        }
        out
    }
}

fn expect_bool(name: &str, value: &serde_json::Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| SchemaError::invalid_option(name, format!("must be a boolean, got {}", value)))
}
