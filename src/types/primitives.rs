//! Builtin scalar types and the untyped passthrough

use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use regex::Regex;

use super::{coercion, incompatible, Family, OptionCheck, Type};
use crate::error::{Result, SchemaError};
use crate::example::ExampleContext;
use crate::options::Options;
use crate::path::ValuePath;
use crate::resolver::PathResolver;
use crate::value::Value;

const TRUE_VALUES: &[&str] = &["true", "t", "1"];
const FALSE_VALUES: &[&str] = &["false", "f", "0"];

/// Text; numbers and booleans are coerced to their string form
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl Type for StringType {
    fn name(&self) -> String {
        "String".to_string()
    }

    fn family(&self) -> Family {
        Family::String
    }

    fn native_kind(&self) -> &'static str {
        "string"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value> {
        match raw {
            Value::Null | Value::String(_) => Ok(raw),
            Value::Integer(i) => Ok(Value::String(i.to_string())),
            Value::Float(f) => Ok(Value::String(f.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(incompatible(path, "string", &other)),
        }
    }

    fn validate(
        &self,
        value: &Value,
        path: &ValuePath,
        options: &Options,
        _scope: &PathResolver,
    ) -> Vec<String> {
        let (Some(text), Some(pattern)) = (value.as_str(), option_str(options, "regexp")) else {
            return Vec::new();
        };
        match Regex::new(pattern) {
            Ok(regex) if regex.is_match(text) => Vec::new(),
            Ok(_) => vec![format!(
                "Attribute {} value ({:?}) does not match regexp ({:?}).",
                path, text, pattern
            )],
            Err(e) => vec![format!("Attribute {} has an invalid regexp: {}", path, e)],
        }
    }

    fn example(&self, _path: &ValuePath, options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        let word = ctx.word();
        match option_str(options, "regexp") {
            None => Ok(Value::String(word)),
            Some(pattern) => {
                let regex = Regex::new(pattern)
                    .map_err(|e| SchemaError::invalid_option("regexp", e.to_string()))?;
                if regex.is_match(&word) {
                    Ok(Value::String(word))
                } else {
                    Err(SchemaError::invalid_option(
                        "regexp",
                        format!("cannot synthesize a value matching {:?}; supply an example", pattern),
                    ))
                }
            }
        }
    }

    fn check_option(&self, name: &str, value: &serde_json::Value) -> Result<OptionCheck> {
        match name {
            "regexp" => {
                let pattern = value
                    .as_str()
                    .ok_or_else(|| SchemaError::invalid_option(name, "must be a string"))?;
                Regex::new(pattern).map_err(|e| SchemaError::invalid_option(name, e.to_string()))?;
                Ok(OptionCheck::Known)
            }
            _ => Ok(OptionCheck::Unknown),
        }
    }
}

/// Whole numbers; numeric text and integral floats are coerced
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl Type for Integer {
    fn name(&self) -> String {
        "Integer".to_string()
    }

    fn family(&self) -> Family {
        Family::Numeric
    }

    fn native_kind(&self) -> &'static str {
        "integer"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Integer(_))
    }

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value> {
        match raw {
            Value::Null | Value::Integer(_) => Ok(raw),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Value::Integer(f as i64))
            }
            Value::String(ref text) => text
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| coercion(path, &raw, "Integer")),
            Value::Float(_) => Err(coercion(path, &raw, "Integer")),
            other => Err(incompatible(path, "integer", &other)),
        }
    }

    fn validate(
        &self,
        value: &Value,
        path: &ValuePath,
        options: &Options,
        _scope: &PathResolver,
    ) -> Vec<String> {
        range_errors(value, path, options)
    }

    fn example(&self, _path: &ValuePath, options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        let (min, max) = bounds(options, 0.0, 1000.0)?;
        let (min, max) = (min.ceil() as i64, max.floor() as i64);
        if min > max {
            return Err(SchemaError::invalid_option("min", "no integer lies within min..max"));
        }
        Ok(Value::Integer(ctx.rng().gen_range(min..=max)))
    }

    fn check_option(&self, name: &str, value: &serde_json::Value) -> Result<OptionCheck> {
        check_numeric_option(name, value)
    }
}

/// Floating point numbers; integers and numeric text are coerced
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl Type for Float {
    fn name(&self) -> String {
        "Float".to_string()
    }

    fn family(&self) -> Family {
        Family::Numeric
    }

    fn native_kind(&self) -> &'static str {
        "float"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Float(_))
    }

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value> {
        match raw {
            Value::Null | Value::Float(_) => Ok(raw),
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            Value::String(ref text) => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| coercion(path, &raw, "Float")),
            other => Err(incompatible(path, "float", &other)),
        }
    }

    fn validate(
        &self,
        value: &Value,
        path: &ValuePath,
        options: &Options,
        _scope: &PathResolver,
    ) -> Vec<String> {
        range_errors(value, path, options)
    }

    fn example(&self, _path: &ValuePath, options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        let (min, max) = bounds(options, 0.0, 1000.0)?;
        if min >= max {
            return Ok(Value::Float(min));
        }
        Ok(Value::Float(ctx.rng().gen_range(min..max)))
    }

    fn check_option(&self, name: &str, value: &serde_json::Value) -> Result<OptionCheck> {
        check_numeric_option(name, value)
    }
}

/// Booleans from a closed set of spellings
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl Type for Boolean {
    fn name(&self) -> String {
        "Boolean".to_string()
    }

    fn family(&self) -> Family {
        Family::Boolean
    }

    fn native_kind(&self) -> &'static str {
        "boolean"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value> {
        match raw {
            Value::Null | Value::Bool(_) => Ok(raw),
            Value::Integer(1) => Ok(Value::Bool(true)),
            Value::Integer(0) => Ok(Value::Bool(false)),
            Value::String(ref text) if TRUE_VALUES.contains(&text.as_str()) => Ok(Value::Bool(true)),
            Value::String(ref text) if FALSE_VALUES.contains(&text.as_str()) => Ok(Value::Bool(false)),
            Value::String(_) | Value::Integer(_) => Err(coercion(path, &raw, "Boolean")),
            other => Err(incompatible(path, "boolean", &other)),
        }
    }

    fn example(&self, _path: &ValuePath, _options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        Ok(Value::Bool(ctx.rng().gen_bool(0.5)))
    }
}

/// RFC 3339 timestamps; integers are read as epoch seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeType;

impl Type for DateTimeType {
    fn name(&self) -> String {
        "DateTime".to_string()
    }

    fn family(&self) -> Family {
        Family::Temporal
    }

    fn native_kind(&self) -> &'static str {
        "datetime"
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::DateTime(_))
    }

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value> {
        match raw {
            Value::Null | Value::DateTime(_) => Ok(raw),
            Value::String(ref text) => DateTime::parse_from_rfc3339(text.trim())
                .map(Value::DateTime)
                .map_err(|_| coercion(path, &raw, "DateTime")),
            Value::Integer(seconds) => DateTime::<Utc>::from_timestamp(seconds, 0)
                .map(|dt| Value::DateTime(DateTime::<FixedOffset>::from(dt)))
                .ok_or_else(|| coercion(path, &raw, "DateTime")),
            other => Err(incompatible(path, "datetime", &other)),
        }
    }

    fn example(&self, path: &ValuePath, _options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        let seconds = 1_600_000_000 + ctx.rng().gen_range(0..100_000_000i64);
        self.load(Value::Integer(seconds), path)
    }
}

/// Untyped passthrough for values with no declared shape
#[derive(Debug, Clone, Copy, Default)]
pub struct Object;

impl Type for Object {
    fn name(&self) -> String {
        "Object".to_string()
    }

    fn family(&self) -> Family {
        Family::Any
    }

    fn native_kind(&self) -> &'static str {
        "any"
    }

    fn check_type(&self, _value: &Value) -> bool {
        true
    }

    fn load(&self, raw: Value, _path: &ValuePath) -> Result<Value> {
        Ok(raw)
    }

    fn example(&self, _path: &ValuePath, _options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        Ok(Value::String(ctx.word()))
    }
}

fn option_str<'a>(options: &'a Options, name: &str) -> Option<&'a str> {
    options.type_option(name).and_then(serde_json::Value::as_str)
}

fn option_f64(options: &Options, name: &str) -> Option<f64> {
    options.type_option(name).and_then(serde_json::Value::as_f64)
}

fn bounds(options: &Options, default_min: f64, span: f64) -> Result<(f64, f64)> {
    let (min, max) = match (option_f64(options, "min"), option_f64(options, "max")) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min + span),
        (None, Some(max)) => (max - span, max),
        (None, None) => (default_min, default_min + span),
    };
    if min > max {
        return Err(SchemaError::invalid_option("min", format!("min ({}) exceeds max ({})", min, max)));
    }
    Ok((min, max))
}

fn range_errors(value: &Value, path: &ValuePath, options: &Options) -> Vec<String> {
    let Some(number) = value.as_f64() else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    if let Some(min) = option_f64(options, "min") {
        if number < min {
            errors.push(format!(
                "Attribute {} value ({}) is smaller than the allowed min ({}).",
                path, value, min
            ));
        }
    }
    if let Some(max) = option_f64(options, "max") {
        if number > max {
            errors.push(format!(
                "Attribute {} value ({}) is larger than the allowed max ({}).",
                path, value, max
            ));
        }
    }
    errors
}

fn check_numeric_option(name: &str, value: &serde_json::Value) -> Result<OptionCheck> {
    match name {
        "min" | "max" if value.is_number() => Ok(OptionCheck::Known),
        "min" | "max" => Err(SchemaError::invalid_option(name, format!("must be a number, got {}", value))),
        _ => Ok(OptionCheck::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> ValuePath {
        ValuePath::root()
    }

    #[test]
    fn test_string_load() {
        assert_eq!(StringType.load(Value::Integer(4), &root()).unwrap(), Value::from("4"));
        assert!(matches!(
            StringType.load(Value::Collection(vec![]), &root()),
            Err(SchemaError::IncompatibleType { .. })
        ));
    }

    #[test]
    fn test_integer_load() {
        assert_eq!(Integer.load(Value::from(" 42 "), &root()).unwrap(), Value::Integer(42));
        assert_eq!(Integer.load(Value::Float(3.0), &root()).unwrap(), Value::Integer(3));
        assert!(matches!(
            Integer.load(Value::from("abc"), &root()),
            Err(SchemaError::Coercion { .. })
        ));
        assert!(matches!(
            Integer.load(Value::Bool(true), &root()),
            Err(SchemaError::IncompatibleType { .. })
        ));
    }

    #[test]
    fn test_boolean_spellings() {
        assert_eq!(Boolean.load(Value::from("t"), &root()).unwrap(), Value::Bool(true));
        assert_eq!(Boolean.load(Value::Integer(0), &root()).unwrap(), Value::Bool(false));
        assert!(matches!(
            Boolean.load(Value::from("maybe"), &root()),
            Err(SchemaError::Coercion { .. })
        ));
    }

    #[test]
    fn test_datetime_load_is_idempotent() {
        let loaded = DateTimeType.load(Value::from("2024-01-02T03:04:05Z"), &root()).unwrap();
        assert!(DateTimeType.check_type(&loaded));
        assert_eq!(DateTimeType.load(loaded.clone(), &root()).unwrap(), loaded);
        assert_eq!(loaded.to_json(), json!("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn test_range_validation() {
        let options = Options::new().option("min", json!(1)).option("max", json!(10));
        let scope = PathResolver::new();
        assert!(Integer.validate(&Value::Integer(5), &root(), &options, &scope).is_empty());
        assert_eq!(Integer.validate(&Value::Integer(11), &root(), &options, &scope).len(), 1);
        assert_eq!(Float.validate(&Value::Float(0.5), &root(), &options, &scope).len(), 1);
    }

    #[test]
    fn test_regexp_validation() {
        let options = Options::new().option("regexp", json!("^[a-z]+$"));
        let scope = PathResolver::new();
        assert!(StringType.validate(&Value::from("abc"), &root(), &options, &scope).is_empty());
        assert_eq!(StringType.validate(&Value::from("ABC"), &root(), &options, &scope).len(), 1);
        assert!(StringType.check_option("regexp", &json!("(")).is_err());
    }

    #[test]
    fn test_examples_respect_bounds() {
        let mut ctx = ExampleContext::seeded(11);
        let options = Options::new().option("min", json!(5)).option("max", json!(6));
        for _ in 0..10 {
            let value = Integer.example(&root(), &options, &mut ctx).unwrap();
            let n = value.as_i64().unwrap();
            assert!((5..=6).contains(&n));
        }
    }
}
