//! Homogeneous collections

use std::sync::Arc;

use super::{incompatible, parse_json, Family, OptionCheck, Type, TypeDescription, TypeRef};
use crate::attribute::Attribute;
use crate::error::{Result, SchemaError};
use crate::example::ExampleContext;
use crate::options::Options;
use crate::path::ValuePath;
use crate::record::RecordBlock;
use crate::resolver::PathResolver;
use crate::value::Value;

/// Ordered list whose items are all loaded through one member attribute
#[derive(Debug, Clone)]
pub struct Collection {
    member: Attribute,
}

impl Collection {
    pub fn of(member: TypeRef) -> Result<Self> {
        Ok(Self::of_attribute(Attribute::new(member, Options::new())?))
    }

    pub fn of_attribute(member: Attribute) -> Self {
        Self { member }
    }

    pub fn member(&self) -> &Attribute {
        &self.member
    }

    fn size_bound(options: &Options, name: &str) -> Option<usize> {
        options
            .type_option(name)
            .and_then(serde_json::Value::as_u64)
            .map(|n| n as usize)
    }
}

impl Type for Collection {
    fn name(&self) -> String {
        "Collection".to_string()
    }

    fn family(&self) -> Family {
        Family::Array
    }

    fn native_kind(&self) -> &'static str {
        "collection"
    }

    fn id(&self) -> String {
        format!("Collection[{}]", self.member.type_ref().id())
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Collection(_))
    }

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value> {
        let items = match raw {
            Value::Null => return Ok(Value::Null),
            Value::Collection(items) => items,
            Value::String(text) => match parse_json(&text, path, "Collection")? {
                Value::Collection(items) => items,
                other => return Err(incompatible(path, "collection", &other)),
            },
            other => return Err(incompatible(path, "collection", &other)),
        };

        let loaded = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                self.member
                    .load(Some(item), &path.index(i), None)
                    .map(|value| value.unwrap_or(Value::Null))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Collection(loaded))
    }

    fn dump(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Collection(items) => {
                serde_json::Value::Array(items.iter().map(|item| self.member.dump(item)).collect())
            }
            other => other.to_json(),
        }
    }

    fn validate(
        &self,
        value: &Value,
        path: &ValuePath,
        options: &Options,
        scope: &PathResolver,
    ) -> Vec<String> {
        let Value::Collection(items) = value else {
            return Vec::new();
        };

        let mut errors = Vec::new();
        if let Some(min) = Self::size_bound(options, "min_size") {
            if items.len() < min {
                errors.push(format!(
                    "Attribute {} has {} items but requires at least {}.",
                    path,
                    items.len(),
                    min
                ));
            }
        }
        if let Some(max) = Self::size_bound(options, "max_size") {
            if items.len() > max {
                errors.push(format!(
                    "Attribute {} has {} items but allows at most {}.",
                    path,
                    items.len(),
                    max
                ));
            }
        }

        for (i, item) in items.iter().enumerate() {
            errors.extend(self.member.validate(Some(item), &path.index(i), scope));
        }
        errors
    }

    fn example(&self, path: &ValuePath, options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        let mut size = ctx.collection_size();
        if let Some(min) = Self::size_bound(options, "min_size") {
            size = size.max(min);
        }
        if let Some(max) = Self::size_bound(options, "max_size") {
            size = size.min(max);
        }

        let keep_null = self.member.is_nullable();
        let mut items = Vec::with_capacity(size);
        for i in 0..size {
            let item = self.member.example(&path.index(i), ctx)?;
            if keep_null || !item.is_null() {
                items.push(item);
            }
        }

        // members exhausted by the depth limit can leave the collection short
        match Self::size_bound(options, "min_size") {
            Some(min) if items.len() < min => Ok(Value::Null),
            _ => Ok(Value::Collection(items)),
        }
    }

    fn describe(&self, _shallow: bool) -> TypeDescription {
        let mut description = TypeDescription::new(self.name(), self.family(), self.id());
        description.member = Some(Box::new(self.member.describe(None)));
        description
    }

    fn check_option(&self, name: &str, value: &serde_json::Value) -> Result<OptionCheck> {
        match name {
            "min_size" | "max_size" if value.is_u64() => Ok(OptionCheck::Known),
            "min_size" | "max_size" => Err(SchemaError::invalid_option(
                name,
                format!("must be a non-negative integer, got {}", value),
            )),
            _ => Ok(OptionCheck::Unknown),
        }
    }

    /// A block given to a collection defines its member record
    fn construct(&self, block: RecordBlock) -> Result<TypeRef> {
        let member = self.member.type_ref().construct(block)?;
        let attribute = Attribute::new(member, self.member.options().clone())?;
        Ok(Arc::new(Collection::of_attribute(attribute)))
    }
}
