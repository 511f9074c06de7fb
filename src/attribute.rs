//! Attributes: a type bound to a set of options
//!
//! The attribute layers default / required / nullable / allowed-values /
//! example semantics uniformly over any [`Type`](crate::types::Type).

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::{Result, SchemaError};
use crate::example::ExampleContext;
use crate::options::{DefaultValue, ExampleSpec, Options};
use crate::path::ValuePath;
use crate::record::Record;
use crate::resolver::PathResolver;
use crate::types::{OptionCheck, TypeDescription, TypeRef};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Attribute {
    type_ref: TypeRef,
    options: Options,
    null_by_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_description: TypeDescription,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Attribute {
    /// Create an attribute, validating its options against the type
    pub fn new(type_ref: TypeRef, mut options: Options) -> Result<Self> {
        for (name, value) in options.type_options() {
            match type_ref.check_option(name, value)? {
                OptionCheck::Known => {}
                OptionCheck::Unknown => {
                    return Err(SchemaError::invalid_option(
                        name.clone(),
                        format!("unsupported option for {}", type_ref.name()),
                    ))
                }
            }
        }

        if options.is_required() && options.default_value().is_some() {
            return Err(SchemaError::invalid_option(
                "default",
                "a required attribute cannot declare a default",
            ));
        }

        let root = ValuePath::root();
        if let Some(DefaultValue::Static(value)) = options.default_value() {
            let loaded = type_ref.load(value.clone(), &root)?;
            if !loaded.is_null() && !type_ref.check_type(&loaded) {
                return Err(SchemaError::invalid_option(
                    "default",
                    format!("{} is not a valid {}", value, type_ref.name()),
                ));
            }
            options.set_default(Some(DefaultValue::Static(loaded)));
        }

        if let Some(values) = options.allowed_values() {
            let loaded = values
                .iter()
                .map(|value| type_ref.load(value.clone(), &root))
                .collect::<Result<Vec<_>>>()?;
            options.set_values(Some(loaded));
        }

        Ok(Self {
            type_ref,
            options,
            null_by_default: false,
        })
    }

    pub(crate) fn with_null_default(mut self, null_by_default: bool) -> Self {
        self.null_by_default = null_by_default;
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_required(&self) -> bool {
        self.options.is_required()
    }

    pub fn is_nullable(&self) -> bool {
        self.options.explicit_nullable().unwrap_or(self.null_by_default)
    }

    /// Load a raw value; absent or null results fall back to the default.
    ///
    /// `None` in and no default means `None` out, so callers can tell a
    /// missing field from one explicitly set to null.
    pub fn load(
        &self,
        raw: Option<Value>,
        path: &ValuePath,
        parent: Option<&Record>,
    ) -> Result<Option<Value>> {
        let loaded = match raw {
            Some(value) => Some(self.type_ref.load(value, path)?),
            None => None,
        };

        if loaded.as_ref().map_or(true, Value::is_null) {
            if let Some(default) = self.options.default_value() {
                let value = match default {
                    DefaultValue::Static(value) => value.clone(),
                    DefaultValue::Generator(generate) => generate(parent, path),
                };
                return Ok(Some(self.type_ref.load(value, path)?));
            }
        }

        Ok(loaded)
    }

    pub fn dump(&self, value: &Value) -> serde_json::Value {
        if value.is_null() {
            serde_json::Value::Null
        } else {
            self.type_ref.dump(value)
        }
    }

    /// Validate a field value; `None` means the field was not provided
    pub fn validate(&self, value: Option<&Value>, path: &ValuePath, scope: &PathResolver) -> Vec<String> {
        let value = match value {
            None => return self.validate_missing(path, scope),
            Some(Value::Null) if self.is_nullable() => return Vec::new(),
            Some(Value::Null) => return vec![format!("Attribute {} is not nullable.", path)],
            Some(value) => value,
        };

        if !self.type_ref.check_type(value) {
            return vec![format!(
                "Attribute {} received value of type {} but should have been {}.",
                path,
                value.kind(),
                self.type_ref.name()
            )];
        }

        if let Some(values) = self.options.allowed_values() {
            if !values.contains(value) {
                let allowed: Vec<String> = values.iter().map(ToString::to_string).collect();
                return vec![format!(
                    "Attribute {} value ({}) is not within the allowed values=({}).",
                    path,
                    value,
                    allowed.join(", ")
                )];
            }
        }

        self.type_ref.validate(value, path, &self.options, scope)
    }

    fn validate_missing(&self, path: &ValuePath, scope: &PathResolver) -> Vec<String> {
        if self.is_required() {
            return vec![format!("Attribute {} is required.", path)];
        }

        if let Some(condition) = self.options.condition() {
            let prefix = path.parent().dotted();
            if scope.check(&prefix, &condition.path, condition.predicate.as_ref()) {
                let reason = match &condition.predicate {
                    None => "is present".to_string(),
                    Some(predicate) => format!("matches {}", predicate.describe()),
                };
                return vec![format!(
                    "Attribute {} is required when {} (from {}) {}.",
                    path, condition.path, prefix, reason
                )];
            }
        }

        Vec::new()
    }

    /// Generate an example: `example` option, then allowed values, then the type
    pub fn example(&self, path: &ValuePath, ctx: &mut ExampleContext) -> Result<Value> {
        let raw = match self.options.example_spec() {
            Some(ExampleSpec::Static(value)) => value.clone(),
            Some(ExampleSpec::Generator(generate)) => generate(path, ctx),
            None => match self.options.allowed_values() {
                Some(values) if !values.is_empty() => {
                    values.choose(ctx.rng()).cloned().unwrap_or(Value::Null)
                }
                _ => return self.type_ref.example(path, &self.options, ctx),
            },
        };
        self.type_ref.load(raw, path)
    }

    /// Named record types are described shallowly; everything else in full
    pub fn describe(&self, name: Option<&str>) -> AttributeDescription {
        let shallow = self
            .type_ref
            .as_record()
            .map_or(false, |record| !record.is_anonymous());
        AttributeDescription {
            name: name.map(str::to_string),
            type_description: self.type_ref.describe(shallow),
            options: self.options.describe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Condition;
    use crate::resolver::Predicate;
    use crate::types;
    use serde_json::json;

    #[test]
    fn test_required_and_default_conflict() {
        let err = Attribute::new(types::string(), Options::new().required().with_default("x")).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidOption { ref name, .. } if name == "default"));
    }

    #[test]
    fn test_unknown_type_option_rejected() {
        assert!(Attribute::new(types::boolean(), Options::new().option("regexp", json!("x"))).is_err());
        assert!(Attribute::new(types::integer(), Options::new().option("min", json!(1))).is_ok());
    }

    #[test]
    fn test_default_must_match_type() {
        assert!(Attribute::new(types::integer(), Options::new().with_default("abc")).is_err());
        assert!(Attribute::new(types::integer(), Options::new().with_default("12")).is_ok());
    }

    #[test]
    fn test_load_applies_defaults() {
        let attribute = Attribute::new(types::integer(), Options::new().with_default(5i64)).unwrap();
        let path = ValuePath::root().field("count");
        assert_eq!(attribute.load(None, &path, None).unwrap(), Some(Value::Integer(5)));
        assert_eq!(attribute.load(Some(Value::Null), &path, None).unwrap(), Some(Value::Integer(5)));
        assert_eq!(attribute.load(Some(Value::from("7")), &path, None).unwrap(), Some(Value::Integer(7)));

        let plain = Attribute::new(types::integer(), Options::new()).unwrap();
        assert_eq!(plain.load(None, &path, None).unwrap(), None);
    }

    #[test]
    fn test_generated_default() {
        let attribute = Attribute::new(
            types::string(),
            Options::new().with_default_fn(|_, path| Value::from(path.to_string())),
        )
        .unwrap();
        let path = ValuePath::root().field("label");
        assert_eq!(attribute.load(None, &path, None).unwrap(), Some(Value::from("$.label")));
    }

    #[test]
    fn test_validate_missing_and_null() {
        let scope = PathResolver::new();
        let path = ValuePath::root().field("name");

        let required = Attribute::new(types::string(), Options::new().required()).unwrap();
        assert_eq!(required.validate(None, &path, &scope), vec!["Attribute $.name is required."]);

        let optional = Attribute::new(types::string(), Options::new()).unwrap();
        assert!(optional.validate(None, &path, &scope).is_empty());
        assert_eq!(optional.validate(Some(&Value::Null), &path, &scope).len(), 1);

        let nullable = Attribute::new(types::string(), Options::new().nullable(true)).unwrap();
        assert!(nullable.validate(Some(&Value::Null), &path, &scope).is_empty());
    }

    #[test]
    fn test_validate_type_mismatch_stops() {
        let scope = PathResolver::new();
        let attribute = Attribute::new(types::integer(), Options::new().values([1i64, 2])).unwrap();
        let errors = attribute.validate(Some(&Value::from("x")), &ValuePath::root().field("n"), &scope);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("should have been Integer"));
    }

    #[test]
    fn test_validate_allowed_values() {
        let scope = PathResolver::new();
        let attribute = Attribute::new(types::string(), Options::new().values(["red", "green"])).unwrap();
        let path = ValuePath::root().field("color");
        assert!(attribute.validate(Some(&Value::from("red")), &path, &scope).is_empty());
        let errors = attribute.validate(Some(&Value::from("blue")), &path, &scope);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("allowed values"));
    }

    #[test]
    fn test_required_if() {
        let attribute = Attribute::new(
            types::string(),
            Options::new().required_if(Condition::matching("kind", Predicate::Str("company".into()))),
        )
        .unwrap();
        let path = ValuePath::root().field("registration");

        let company = PathResolver::for_root(Value::from(json!({"kind": "company"})));
        assert_eq!(attribute.validate(None, &path, &company).len(), 1);

        let person = PathResolver::for_root(Value::from(json!({"kind": "person"})));
        assert!(attribute.validate(None, &path, &person).is_empty());
    }

    #[test]
    fn test_example_prefers_option_then_values() {
        let mut ctx = ExampleContext::seeded(3);
        let path = ValuePath::root().field("color");

        let with_example = Attribute::new(types::string(), Options::new().example("teal")).unwrap();
        assert_eq!(with_example.example(&path, &mut ctx).unwrap(), Value::from("teal"));

        let with_values = Attribute::new(types::string(), Options::new().values(["red", "green"])).unwrap();
        let value = with_values.example(&path, &mut ctx).unwrap();
        assert!(value == Value::from("red") || value == Value::from("green"));
    }
}
