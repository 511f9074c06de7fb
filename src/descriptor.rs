//! JSON record descriptors
//!
//! A descriptor file holds one record descriptor or a list of them. Named
//! record types are registered as they are compiled, so later descriptors
//! can use earlier ones as field types or references.
//!
//! ```json
//! {
//!   "name": "Contact",
//!   "case_insensitive": true,
//!   "attributes": [
//!     {"name": "name", "type": "String", "options": {"required": true}},
//!     {"name": "tags", "type": "Collection", "member": {"type": "String"}},
//!     {"name": "address", "attributes": [{"name": "city", "type": "String"}]}
//!   ],
//!   "requirements": [{"type": "at_least", "count": 1, "attributes": ["name", "tags"]}]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::attribute::Attribute;
use crate::config::EngineConfig;
use crate::error::{Result, SchemaError};
use crate::options::Options;
use crate::record::{RecordBuilder, RecordType};
use crate::requirement::{Requirement, RequirementKind};
use crate::types::{Collection, TypeRef, TypeRegistry};

const COLLECTION: &str = "Collection";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub allow_extra: bool,
    #[serde(default)]
    pub case_insensitive: bool,
    /// Field that collects undeclared keys
    #[serde(default)]
    pub extra: Option<String>,
    #[serde(default)]
    pub allow_null_by_default: Option<bool>,
    /// Registered record type whose fields may be inherited
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
    #[serde(default)]
    pub requirements: Vec<RequirementDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeDescriptor {
    /// Empty for collection members
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
    /// Member of a `Collection`
    #[serde(default)]
    pub member: Option<Box<AttributeDescriptor>>,
    /// Nested record fields; without `type` they define an anonymous record
    #[serde(default)]
    pub attributes: Option<Vec<AttributeDescriptor>>,
    #[serde(default)]
    pub requirements: Vec<RequirementDescriptor>,
    /// Take type and options from the reference record
    #[serde(default)]
    pub inherit: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementDescriptor {
    #[serde(rename = "type")]
    pub kind: RequirementKind,
    #[serde(default)]
    pub count: Option<usize>,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorFile {
    Many(Vec<RecordDescriptor>),
    One(RecordDescriptor),
}

impl RequirementDescriptor {
    pub fn to_requirement(&self) -> Result<Requirement> {
        let count = || {
            self.count.ok_or_else(|| {
                SchemaError::invalid_option("count", format!("{:?} requirements need a count", self.kind))
            })
        };
        let requirement = match self.kind {
            RequirementKind::All => Requirement::all(self.attributes.iter().cloned()),
            RequirementKind::Exclusive => Requirement::exclusive(self.attributes.iter().cloned()),
            RequirementKind::Exactly => Requirement::exactly(count()?, self.attributes.iter().cloned()),
            RequirementKind::AtLeast => Requirement::at_least(count()?, self.attributes.iter().cloned()),
            RequirementKind::AtMost => Requirement::at_most(count()?, self.attributes.iter().cloned()),
        };
        Ok(match &self.description {
            Some(description) => requirement.with_description(description.clone()),
            None => requirement,
        })
    }
}

/// Compiles descriptors into record types against a type registry
#[derive(Debug, Clone)]
pub struct DescriptorLoader {
    registry: TypeRegistry,
    allow_null_by_default: bool,
}

impl DescriptorLoader {
    pub fn new(registry: TypeRegistry, config: &EngineConfig) -> Self {
        Self {
            registry,
            allow_null_by_default: config.validation.allow_null_by_default,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Compile every descriptor in a JSON document, in order
    pub fn load_str(&mut self, text: &str) -> Result<Vec<RecordType>> {
        let descriptors = match serde_json::from_str::<DescriptorFile>(text)? {
            DescriptorFile::Many(descriptors) => descriptors,
            DescriptorFile::One(descriptor) => vec![descriptor],
        };
        descriptors
            .into_iter()
            .map(|descriptor| self.compile(descriptor))
            .collect()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<RecordType>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let records = self.load_str(&text)?;
        info!(path = %path.display(), records = records.len(), "loaded record descriptors");
        Ok(records)
    }

    /// Build a record type, compile it eagerly and register it when named
    pub fn compile(&mut self, descriptor: RecordDescriptor) -> Result<RecordType> {
        let RecordDescriptor {
            name,
            allow_extra,
            case_insensitive,
            extra,
            allow_null_by_default,
            reference,
            attributes,
            requirements,
        } = descriptor;

        let mut builder = match name {
            Some(name) => RecordType::builder(name),
            None => RecordType::anonymous_builder(),
        }
        .allow_extra(allow_extra)
        .case_insensitive(case_insensitive)
        .allow_null_by_default(allow_null_by_default.unwrap_or(self.allow_null_by_default));

        if let Some(extra) = extra {
            builder = builder.extra_bucket(extra);
        }
        if let Some(reference) = reference {
            let resolved = self.registry.resolve(&reference)?;
            let record = resolved.as_record().cloned().ok_or_else(|| {
                SchemaError::invalid_option("reference", format!("{} is not a record type", reference))
            })?;
            builder = builder.reference(record);
        }

        let registry = self.registry.clone();
        let record = builder.build(move |r| build_fields(r, &registry, attributes, requirements));
        record.field_names()?;

        if !record.is_anonymous() {
            self.registry.register_record(record.clone())?;
        }
        debug!(record = ?record.name(), "compiled descriptor");
        Ok(record)
    }
}

fn build_fields(
    builder: &mut RecordBuilder,
    registry: &TypeRegistry,
    attributes: Vec<AttributeDescriptor>,
    requirements: Vec<RequirementDescriptor>,
) -> Result<()> {
    for attribute in attributes {
        declare(builder, registry, attribute)?;
    }
    for requirement in &requirements {
        builder.requires(requirement.to_requirement()?);
    }
    Ok(())
}

fn declare(builder: &mut RecordBuilder, registry: &TypeRegistry, descriptor: AttributeDescriptor) -> Result<()> {
    let options = Options::from_json(&descriptor.options)?;
    let name = descriptor.name.clone();

    if descriptor.inherit {
        builder.inherit(&name, options)?;
        return Ok(());
    }

    if descriptor.type_id.is_none() {
        if let Some(nested) = descriptor.attributes {
            let registry = registry.clone();
            let requirements = descriptor.requirements;
            builder.record(&name, options, move |r| build_fields(r, &registry, nested, requirements))?;
            return Ok(());
        }
    }

    let type_ref = field_type(registry, descriptor)?;
    builder.field(&name, type_ref, options)?;
    Ok(())
}

/// Resolve the type of a field or collection member
fn field_type(registry: &TypeRegistry, descriptor: AttributeDescriptor) -> Result<TypeRef> {
    let AttributeDescriptor {
        name,
        type_id,
        member,
        attributes,
        requirements,
        ..
    } = descriptor;

    let base = match type_id.as_deref() {
        Some(COLLECTION) => {
            let member = member.ok_or_else(|| {
                SchemaError::invalid_option("member", format!("collection {} needs a member", name))
            })?;
            let options = Options::from_json(&member.options)?;
            let member_type = field_type(registry, *member)?;
            let collection: TypeRef = Arc::new(Collection::of_attribute(Attribute::new(member_type, options)?));
            collection
        }
        Some(id) => registry.resolve(id)?,
        None if attributes.is_some() => {
            let record = RecordType::anonymous(|_| Ok(()));
            Arc::new(record)
        }
        None => {
            return Err(SchemaError::invalid_option(
                "type",
                format!("field {:?} needs a type or nested attributes", name),
            ))
        }
    };

    match attributes {
        Some(nested) => {
            let registry = registry.clone();
            base.construct(Box::new(move |r: &mut RecordBuilder| build_fields(r, &registry, nested, requirements)))
        }
        None => Ok(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ValuePath;
    use crate::types::Type;
    use crate::value::Value;
    use serde_json::json;

    fn loader() -> DescriptorLoader {
        DescriptorLoader::new(TypeRegistry::new(), &EngineConfig::default())
    }

    #[test]
    fn test_compile_simple_descriptor() {
        let mut loader = loader();
        let records = loader
            .load_str(
                r#"{"name": "Point", "attributes": [
                    {"name": "x", "type": "Integer", "options": {"required": true}},
                    {"name": "y", "type": "Integer", "options": {"default": 0}}
                ]}"#,
            )
            .unwrap();
        let point = &records[0];
        assert_eq!(point.field_names().unwrap(), ["x", "y"]);
        assert!(loader.registry().contains("Point"));

        let loaded = point.load(Value::from(json!({"x": "3"})), &ValuePath::root()).unwrap();
        assert_eq!(point.dump(&loaded), json!({"x": 3, "y": 0}));
    }

    #[test]
    fn test_named_types_are_reusable() {
        let mut loader = loader();
        let records = loader
            .load_str(
                r#"[
                    {"name": "Tag", "attributes": [{"name": "label", "type": "String"}]},
                    {"name": "Post", "attributes": [
                        {"name": "tags", "type": "Collection", "member": {"type": "Tag"}}
                    ]}
                ]"#,
            )
            .unwrap();
        let post = &records[1];
        let loaded = post
            .load(Value::from(json!({"tags": [{"label": "rust"}]})), &ValuePath::root())
            .unwrap();
        let tag = loaded.get("tags").and_then(|tags| tags.at(0)).unwrap();
        assert_eq!(tag.get("label"), Some(Value::from("rust")));
    }

    #[test]
    fn test_requirement_needs_count() {
        let mut loader = loader();
        let err = loader
            .load_str(
                r#"{"name": "Bad", "attributes": [{"name": "a", "type": "String"}],
                    "requirements": [{"type": "at_least", "attributes": ["a"]}]}"#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("count"));
        assert!(!loader.registry().contains("Bad"));
    }

    #[test]
    fn test_unknown_type_fails_eagerly() {
        let mut loader = loader();
        let err = loader
            .load_str(r#"{"name": "Bad", "attributes": [{"name": "a", "type": "Money"}]}"#)
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition(_)));
    }

    #[test]
    fn test_reference_and_inherit() {
        let mut loader = loader();
        let records = loader
            .load_str(
                r#"[
                    {"name": "Base", "attributes": [{"name": "code", "type": "String"}]},
                    {"name": "Strict", "reference": "Base", "attributes": [
                        {"name": "code", "inherit": true, "options": {"required": true}}
                    ]}
                ]"#,
            )
            .unwrap();
        let strict = &records[1];
        assert!(strict.attribute("code").unwrap().unwrap().is_required());
    }

    #[test]
    fn test_config_null_default() {
        let mut config = EngineConfig::default();
        config.validation.allow_null_by_default = true;
        let mut loader = DescriptorLoader::new(TypeRegistry::new(), &config);
        let records = loader
            .load_str(r#"{"name": "Loose", "attributes": [{"name": "a", "type": "String"}]}"#)
            .unwrap();
        assert!(records[0].attribute("a").unwrap().unwrap().is_nullable());
    }
}
