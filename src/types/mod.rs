//! Value type descriptors
//!
//! Every kind of value (primitive, container, record) implements [`Type`].
//! Types are stateless and shared as [`TypeRef`]; the [`TypeRegistry`]
//! resolves type identifiers to implementations when a schema is compiled.

pub mod collection;
pub mod primitives;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::attribute::AttributeDescription;
use crate::error::{Result, SchemaError};
use crate::example::ExampleContext;
use crate::options::Options;
use crate::path::ValuePath;
use crate::record::{RecordBlock, RecordType};
use crate::requirement::RequirementDescription;
use crate::resolver::PathResolver;
use crate::value::Value;

pub use collection::Collection;
pub use primitives::{Boolean, DateTimeType, Float, Integer, Object, StringType};
pub use registry::TypeRegistry;

/// Shared handle to a type implementation
pub type TypeRef = Arc<dyn Type>;

/// Broad classification reported by `describe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    String,
    Numeric,
    Temporal,
    Boolean,
    Hash,
    Array,
    Any,
}

/// Outcome of asking a type about a type-specific option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionCheck {
    Known,
    Unknown,
}

/// Capability contract shared by every value descriptor.
///
/// `load` must be idempotent: a value already in the type's native
/// representation is returned unchanged.
pub trait Type: Send + Sync + fmt::Debug {
    fn name(&self) -> String;

    fn family(&self) -> Family;

    /// Tag of the native [`Value`] variant this type loads into
    fn native_kind(&self) -> &'static str;

    fn id(&self) -> String {
        self.name()
    }

    /// Whether `value` is already canonical for this type
    fn check_type(&self, value: &Value) -> bool;

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value>;

    fn dump(&self, value: &Value) -> serde_json::Value {
        value.to_json()
    }

    /// Type-specific rules (ranges, patterns, sizes) for a well-typed value
    fn validate(
        &self,
        _value: &Value,
        _path: &ValuePath,
        _options: &Options,
        _scope: &PathResolver,
    ) -> Vec<String> {
        Vec::new()
    }

    fn example(&self, path: &ValuePath, options: &Options, ctx: &mut ExampleContext)
        -> Result<Value>;

    fn describe(&self, _shallow: bool) -> TypeDescription {
        TypeDescription::new(self.name(), self.family(), self.id())
    }

    /// Validate a type-specific option at attribute construction
    fn check_option(&self, _name: &str, _value: &serde_json::Value) -> Result<OptionCheck> {
        Ok(OptionCheck::Unknown)
    }

    /// Build a derived type from a nested definition block
    fn construct(&self, _block: RecordBlock) -> Result<TypeRef> {
        Err(SchemaError::invalid_option(
            "block",
            format!("{} does not accept a definition block", self.name()),
        ))
    }

    fn as_record(&self) -> Option<&RecordType> {
        None
    }
}

/// Metadata tree consumed by documentation renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescription {
    pub name: String,
    pub family: Family,
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeDescription>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<RequirementDescription>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Box<AttributeDescription>>,
}

impl TypeDescription {
    pub fn new(name: impl Into<String>, family: Family, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family,
            id: id.into(),
            options: BTreeMap::new(),
            attributes: None,
            requirements: None,
            member: None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub(crate) fn incompatible(path: &ValuePath, expected: &str, raw: &Value) -> SchemaError {
    SchemaError::IncompatibleType {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: raw.kind().to_string(),
    }
}

pub(crate) fn coercion(path: &ValuePath, raw: &Value, target: &str) -> SchemaError {
    SchemaError::Coercion {
        path: path.to_string(),
        value: raw.to_string(),
        target: target.to_string(),
    }
}

/// Parse JSON text handed to a composite type
pub(crate) fn parse_json(text: &str, path: &ValuePath, target: &str) -> Result<Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .map_err(|e| SchemaError::Deserialization {
            path: path.to_string(),
            source_kind: target.to_string(),
            encoding: "JSON",
            excerpt: text.chars().take(64).collect(),
            reason: e.to_string(),
        })
}

pub fn string() -> TypeRef {
    Arc::new(StringType)
}

pub fn integer() -> TypeRef {
    Arc::new(Integer)
}

pub fn float() -> TypeRef {
    Arc::new(Float)
}

pub fn boolean() -> TypeRef {
    Arc::new(Boolean)
}

pub fn date_time() -> TypeRef {
    Arc::new(DateTimeType)
}

pub fn object() -> TypeRef {
    Arc::new(Object)
}

pub fn collection_of(member: TypeRef) -> Result<TypeRef> {
    Ok(Arc::new(Collection::of(member)?))
}
