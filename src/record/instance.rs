//! Loaded record instances

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::RecordType;
use crate::error::{Result, SchemaError};
use crate::path::ValuePath;
use crate::types::{Object, Type};
use crate::value::{Map, Value};

/// Field values of one record, tagged with the type that loaded them.
///
/// Cloning shares the underlying fields. Absent fields are never stored, so
/// `contains` distinguishes "not provided" from "explicitly null".
#[derive(Clone)]
pub struct Record(Arc<RecordState>);

struct RecordState {
    record_type: RecordType,
    fields: RwLock<Map>,
    validating: AtomicBool,
    dumping: AtomicBool,
}

/// Clears a re-entrancy flag when the guarded pass ends
pub(crate) struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn enter(flag: &AtomicBool) -> Option<FlagGuard<'_>> {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .ok()
        .map(|_| FlagGuard(flag))
}

impl Record {
    pub(crate) fn new(record_type: RecordType) -> Self {
        Self(Arc::new(RecordState {
            record_type,
            fields: RwLock::new(Map::new()),
            validating: AtomicBool::new(false),
            dumping: AtomicBool::new(false),
        }))
    }

    pub fn record_type(&self) -> &RecordType {
        &self.0.record_type
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.fields.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.fields.read().contains_key(name)
    }

    /// Load `value` through the field's attribute and store it
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let record_type = &self.0.record_type;
        let path = ValuePath::root().field(name);
        let (key, loaded) = match record_type.resolve_field(name)? {
            Some(attribute) => {
                let key = record_type.canonical_name(name).unwrap_or_else(|| name.to_string());
                let loaded = attribute
                    .load(Some(value.into()), &path, Some(self))?
                    .unwrap_or(Value::Null);
                (key, loaded)
            }
            None if record_type.settings().allow_extra => (name.to_string(), Object.load(value.into(), &path)?),
            None => {
                return Err(SchemaError::UnknownKey {
                    key: name.to_string(),
                    path: ValuePath::root().to_string(),
                })
            }
        };
        self.insert_loaded(key, loaded);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.fields.write().remove(name)
    }

    /// Names of the fields currently present, sorted
    pub fn field_names(&self) -> Vec<String> {
        self.0.fields.read().keys().cloned().collect()
    }

    pub fn to_map(&self) -> Map {
        self.0.fields.read().clone()
    }

    pub(crate) fn insert_loaded(&self, name: String, value: Value) {
        self.0.fields.write().insert(name, value);
    }

    pub fn dump(&self) -> serde_json::Value {
        self.0.record_type.dump_record(self)
    }

    /// Validate against the record's own type with a fresh resolver
    pub fn validate(&self) -> Vec<String> {
        self.0.record_type.validate_root(&Value::Record(self.clone()))
    }

    pub(crate) fn enter_validation(&self) -> Option<FlagGuard<'_>> {
        enter(&self.0.validating)
    }

    pub(crate) fn enter_dump(&self) -> Option<FlagGuard<'_>> {
        enter(&self.0.dumping)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.0.record_type.name())
            .field("fields", &self.field_names())
            .finish()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.record_type.same_as(&other.0.record_type) && self.to_map() == other.to_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::types;
    use serde_json::json;

    fn point() -> RecordType {
        RecordType::new("Point", |r| {
            r.field("x", types::integer(), Options::new())?;
            r.field("y", types::integer(), Options::new())?;
            Ok(())
        })
    }

    #[test]
    fn test_set_loads_through_attribute() {
        let record = point().load_record(Value::from(json!({"x": 1}))).unwrap();
        record.set("y", "2").unwrap();
        assert_eq!(record.get("y"), Some(Value::Integer(2)));
        assert!(record.set("y", "two").is_err());
        assert!(matches!(record.set("z", 3i64), Err(SchemaError::UnknownKey { .. })));
    }

    #[test]
    fn test_remove_and_contains() {
        let record = point().load_record(Value::from(json!({"x": 1, "y": null}))).unwrap();
        assert!(record.contains("y"));
        assert_eq!(record.remove("y"), Some(Value::Null));
        assert!(!record.contains("y"));
        assert_eq!(record.field_names(), vec!["x"]);
    }

    #[test]
    fn test_self_reference_is_guarded() {
        let node = RecordType::builder("Node").allow_extra(true).build(|r| {
            r.field("label", types::string(), Options::new())?;
            Ok(())
        });
        let record = node.load_record(Value::from(json!({"label": "root"}))).unwrap();
        record.set("me", Value::Record(record.clone())).unwrap();

        assert_eq!(record.dump(), json!({"label": "root", "me": "..."}));
        assert!(record.validate().is_empty());

        // break the cycle so the test does not leak
        record.remove("me");
    }

    #[test]
    fn test_equality() {
        let point = point();
        let a = point.load_record(Value::from(json!({"x": 1}))).unwrap();
        let b = point.load_record(Value::from(json!({"x": 1}))).unwrap();
        let c = point.load_record(Value::from(json!({"x": 2}))).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
