//! Type Registry
//!
//! Resolves type identifiers used in record descriptors to implementations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{Boolean, DateTimeType, Float, Integer, Object, StringType, TypeRef};
use crate::error::{Result, SchemaError};
use crate::record::RecordType;

/// Name-keyed lookup of type implementations
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeRef>,
}

impl TypeRegistry {
    /// Registry preloaded with the builtin scalar types
    pub fn new() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
        };
        registry.register("String", Arc::new(StringType));
        registry.register("Integer", Arc::new(Integer));
        registry.register("Float", Arc::new(Float));
        registry.register("Boolean", Arc::new(Boolean));
        registry.register("DateTime", Arc::new(DateTimeType));
        registry.register("Object", Arc::new(Object));
        registry
    }

    /// Register or replace a type under `id`
    pub fn register(&mut self, id: impl Into<String>, type_ref: TypeRef) {
        let id = id.into();
        debug!(id = %id, "registered type");
        self.types.insert(id, type_ref);
    }

    /// Register a named record type under its own name
    pub fn register_record(&mut self, record: RecordType) -> Result<()> {
        let name = record.name().map(str::to_string).ok_or_else(|| {
            SchemaError::invalid_option("name", "anonymous record types cannot be registered")
        })?;
        self.register(name, Arc::new(record));
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Result<TypeRef> {
        self.types
            .get(id)
            .cloned()
            .ok_or_else(|| SchemaError::invalid_option("type", format!("unknown type {:?}", id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.types.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
