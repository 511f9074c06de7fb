//! Collector handed to a record definition block

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{Compiled, RecordSettings, RecordType};
use crate::attribute::Attribute;
use crate::error::{DefinitionError, Result, SchemaError};
use crate::options::Options;
use crate::requirement::Requirement;
use crate::types::TypeRef;

/// Declares the fields and requirements of one record type.
///
/// Fields keep their declaration order; that order drives loading,
/// validation messages and example field selection.
#[derive(Debug)]
pub struct RecordBuilder {
    record: String,
    settings: RecordSettings,
    reference: Option<RecordType>,
    names: Vec<String>,
    attributes: HashMap<String, Attribute>,
    requirements: Vec<Requirement>,
}

impl RecordBuilder {
    pub(super) fn new(record: String, settings: RecordSettings, reference: Option<RecordType>) -> Self {
        Self {
            record,
            settings,
            reference,
            names: Vec::new(),
            attributes: HashMap::new(),
            requirements: Vec::new(),
        }
    }

    /// Type the block may inherit fields from
    pub fn reference(&self) -> Option<&RecordType> {
        self.reference.as_ref()
    }

    pub fn settings(&self) -> &RecordSettings {
        &self.settings
    }

    pub fn field(&mut self, name: &str, type_ref: TypeRef, options: Options) -> Result<&mut Self> {
        let attribute = Attribute::new(type_ref, options)?;
        self.declare(name, attribute)?;
        Ok(self)
    }

    /// Field whose type builds a derived shape from `block`
    pub fn field_with<F>(&mut self, name: &str, type_ref: TypeRef, options: Options, block: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut RecordBuilder) -> Result<()> + Send + 'static,
    {
        let constructed = type_ref.construct(Box::new(block))?;
        self.field(name, constructed, options)
    }

    /// Field typed by a new anonymous record built from `block`.
    ///
    /// When this record has a reference whose field of the same name is a
    /// record, the new record references it in turn.
    pub fn record<F>(&mut self, name: &str, options: Options, block: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut RecordBuilder) -> Result<()> + Send + 'static,
    {
        let inherited = match &self.reference {
            Some(reference) => reference
                .attribute(name)?
                .and_then(|attribute| attribute.type_ref().as_record().cloned()),
            None => None,
        };

        let builder = match inherited {
            Some(parent) => RecordType::anonymous_builder()
                .settings(parent.settings().clone())
                .reference(parent),
            None => RecordType::anonymous_builder(),
        };
        let nested = builder
            .allow_null_by_default(self.settings.allow_null_by_default)
            .build(block);
        self.field(name, Arc::new(nested), options)
    }

    /// Copy a field from the reference type, layering `overrides` on its options
    pub fn inherit(&mut self, name: &str, overrides: Options) -> Result<&mut Self> {
        let Some(reference) = self.reference.clone() else {
            return Err(self.definition_error(format!(
                "field {} has no type and there is no reference to inherit from",
                name
            )));
        };
        let Some(attribute) = reference.attribute(name)? else {
            return Err(self.definition_error(format!(
                "field {} is not declared on the reference {}",
                name,
                reference.label()
            )));
        };
        let options = attribute.options().merged_with(&overrides);
        let type_ref = attribute.type_ref().clone();
        self.field(name, type_ref, options)
    }

    pub fn requires(&mut self, requirement: Requirement) -> &mut Self {
        self.requirements.push(requirement);
        self
    }

    fn declare(&mut self, name: &str, attribute: Attribute) -> Result<()> {
        if name.is_empty() {
            return Err(self.definition_error("field names cannot be empty"));
        }
        if self.attributes.contains_key(name) {
            return Err(self.definition_error(format!("field {} is declared twice", name)));
        }
        let attribute = attribute.with_null_default(self.settings.allow_null_by_default);
        self.names.push(name.to_string());
        self.attributes.insert(name.to_string(), attribute);
        Ok(())
    }

    pub(super) fn definition_error(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::InvalidDefinition(DefinitionError {
            record: self.record.clone(),
            message: message.into(),
        })
    }

    pub(super) fn finish(mut self) -> Result<Compiled> {
        if let Some(bucket) = self.settings.extra_bucket.clone() {
            if !self.attributes.contains_key(&bucket) {
                let holder = RecordType::anonymous_builder().allow_extra(true).build(|_| Ok(()));
                let attribute = Attribute::new(Arc::new(holder), Options::new())?;
                self.declare(&bucket, attribute)?;
            }
        }

        for requirement in &self.requirements {
            if let Some(missing) = requirement
                .attributes()
                .iter()
                .find(|name| !self.attributes.contains_key(name.as_str()))
            {
                return Err(self.definition_error(format!(
                    "requirement ({}) names undeclared field {}",
                    requirement, missing
                )));
            }
        }

        let mut lowercase = HashMap::new();
        if self.settings.case_insensitive {
            let mut seen = HashSet::new();
            for name in &self.names {
                let lower = name.to_lowercase();
                if !seen.insert(lower.clone()) {
                    return Err(self.definition_error(format!(
                        "fields collide case-insensitively on {}",
                        lower
                    )));
                }
                lowercase.insert(lower, name.clone());
            }
        }

        Ok(Compiled {
            names: self.names,
            attributes: self.attributes,
            requirements: self.requirements,
            lowercase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ValuePath;
    use crate::types::{self, Type};
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_duplicate_field_rejected() {
        let record = RecordType::new("Dup", |r| {
            r.field("a", types::string(), Options::new())?;
            r.field("a", types::integer(), Options::new())?;
            Ok(())
        });
        let err = record.field_names().unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_case_collision_rejected() {
        let record = RecordType::builder("Clash").case_insensitive(true).build(|r| {
            r.field("Name", types::string(), Options::new())?;
            r.field("NAME", types::string(), Options::new())?;
            Ok(())
        });
        assert!(matches!(record.field_names(), Err(SchemaError::InvalidDefinition(_))));
    }

    #[test]
    fn test_nested_record_field() {
        let order = RecordType::new("Order", |r| {
            r.record("customer", Options::new().required(), |c| {
                c.field("name", types::string(), Options::new())?;
                Ok(())
            })?;
            Ok(())
        });
        let loaded = order
            .load(Value::from(json!({"customer": {"name": "Ada"}})), &ValuePath::root())
            .unwrap();
        let customer = loaded.get("customer").unwrap();
        assert_eq!(customer.get("name"), Some(Value::from("Ada")));

        let err = order
            .load(Value::from(json!({"customer": {"nme": "Ada"}})), &ValuePath::root())
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown key received: nme for $.customer");
    }

    #[test]
    fn test_inherit_from_reference() {
        let base = RecordType::new("Base", |r| {
            r.field("code", types::string(), Options::new().description("short code"))?;
            r.field("size", types::integer(), Options::new())?;
            Ok(())
        });
        let derived = RecordType::builder("Derived").reference(base).build(|r| {
            r.inherit("code", Options::new().required())?;
            Ok(())
        });
        let code = derived.attribute("code").unwrap().unwrap();
        assert!(code.is_required());
        assert_eq!(code.options().description_text(), Some("short code"));
        assert_eq!(derived.field_names().unwrap(), ["code"]);

        let orphan = RecordType::new("Orphan", |r| {
            r.inherit("code", Options::new())?;
            Ok(())
        });
        assert!(orphan.field_names().is_err());
    }

    #[test]
    fn test_field_with_derives_from_record() {
        let address = RecordType::new("Address", |r| {
            r.field("city", types::string(), Options::new())?;
            r.field("zip", types::string(), Options::new())?;
            Ok(())
        });
        let shipment = RecordType::new("Shipment", move |r| {
            r.field_with("to", Arc::new(address), Options::new(), |a| {
                a.inherit("city", Options::new().required())?;
                Ok(())
            })?;
            Ok(())
        });
        let to = shipment.attribute("to").unwrap().unwrap();
        let derived = to.type_ref().as_record().unwrap();
        assert!(derived.is_anonymous());
        assert_eq!(derived.field_names().unwrap(), ["city"]);
    }

    #[test]
    fn test_collection_member_block() {
        let cart = RecordType::new("Cart", |r| {
            let items = types::collection_of(Arc::new(RecordType::anonymous(|_| Ok(()))))?;
            r.field_with("items", items, Options::new(), |item| {
                item.field("sku", types::string(), Options::new().required())?;
                Ok(())
            })?;
            Ok(())
        });
        let loaded = cart
            .load(Value::from(json!({"items": [{"sku": "A1"}]})), &ValuePath::root())
            .unwrap();
        let first = loaded.get("items").and_then(|items| items.at(0)).unwrap();
        assert_eq!(first.get("sku"), Some(Value::from("A1")));
    }

    #[test]
    fn test_null_by_default_setting() {
        let lenient = RecordType::builder("Lenient").allow_null_by_default(true).build(|r| {
            r.field("note", types::string(), Options::new())?;
            r.field("strict", types::string(), Options::new().nullable(false))?;
            Ok(())
        });
        let value = lenient
            .load(Value::from(json!({"note": null, "strict": null})), &ValuePath::root())
            .unwrap();
        let errors = lenient.validate_root(&value);
        assert_eq!(errors, vec!["Attribute $.strict is not nullable."]);
    }
}
