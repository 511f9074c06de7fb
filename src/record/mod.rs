//! Record types
//!
//! A [`RecordType`] is a [`Type`] whose shape is declared by a builder block.
//! The block is stored when the type is created and compiled exactly once,
//! on first access to the field map. A failing block is cached as a
//! [`DefinitionError`] and surfaced again on every later access.
//!
//! ```
//! use familiar_records::{types, Options, RecordType, Requirement};
//!
//! let person = RecordType::new("Person", |r| {
//!     r.field("name", types::string(), Options::new().required())?;
//!     r.field("email", types::string(), Options::new())?;
//!     r.field("phone", types::string(), Options::new())?;
//!     r.requires(Requirement::at_least(1, ["email", "phone"]));
//!     Ok(())
//! });
//! assert_eq!(person.field_names().unwrap(), ["name", "email", "phone"]);
//! ```

mod builder;
mod instance;

pub use builder::RecordBuilder;
pub use instance::Record;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, trace, warn};

use crate::attribute::Attribute;
use crate::checksum::Checksum;
use crate::error::{DefinitionError, Result, SchemaError};
use crate::example::ExampleContext;
use crate::options::Options;
use crate::path::ValuePath;
use crate::requirement::Requirement;
use crate::resolver::PathResolver;
use crate::selector::AttributeSelector;
use crate::types::{incompatible, parse_json, Family, Object, Type, TypeDescription, TypeRef};
use crate::value::{Map, Value};

/// Definition block run once to declare a record's fields and requirements
pub type RecordBlock = Box<dyn FnOnce(&mut RecordBuilder) -> Result<()> + Send>;

/// Container-wide options of a record type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSettings {
    pub allow_extra: bool,
    pub case_insensitive: bool,
    pub extra_bucket: Option<String>,
    pub allow_null_by_default: bool,
}

/// Cheap-clone handle to a record definition
#[derive(Clone)]
pub struct RecordType(Arc<RecordDefinition>);

struct RecordDefinition {
    name: Option<String>,
    settings: RecordSettings,
    reference: Option<RecordType>,
    block: Mutex<Option<RecordBlock>>,
    compiled: OnceLock<std::result::Result<Compiled, DefinitionError>>,
}

/// Field map produced by a successful build
#[derive(Debug)]
pub(crate) struct Compiled {
    pub(crate) names: Vec<String>,
    pub(crate) attributes: HashMap<String, Attribute>,
    pub(crate) requirements: Vec<Requirement>,
    pub(crate) lowercase: HashMap<String, String>,
}

impl Compiled {
    fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    fn fields(&self) -> impl Iterator<Item = (&String, &Attribute)> {
        self.names
            .iter()
            .filter_map(move |name| self.attributes.get(name).map(|attribute| (name, attribute)))
    }

    /// Canonical field name for an incoming key
    fn resolve_key(&self, key: &str, case_insensitive: bool) -> Option<&str> {
        if let Some((name, _)) = self.attributes.get_key_value(key) {
            return Some(name.as_str());
        }
        if case_insensitive {
            return self.lowercase.get(&key.to_lowercase()).map(String::as_str);
        }
        None
    }
}

/// Options for a record type before its block is attached
#[derive(Debug, Clone, Default)]
pub struct RecordTypeBuilder {
    name: Option<String>,
    settings: RecordSettings,
    reference: Option<RecordType>,
}

impl RecordTypeBuilder {
    pub fn allow_extra(mut self, allow: bool) -> Self {
        self.settings.allow_extra = allow;
        self
    }

    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.settings.case_insensitive = enabled;
        self
    }

    /// Nest undeclared keys under `field`; implies `allow_extra`
    pub fn extra_bucket(mut self, field: impl Into<String>) -> Self {
        self.settings.extra_bucket = Some(field.into());
        self.settings.allow_extra = true;
        self
    }

    pub fn allow_null_by_default(mut self, allow: bool) -> Self {
        self.settings.allow_null_by_default = allow;
        self
    }

    /// Type whose fields can be inherited by name inside the block
    pub fn reference(mut self, reference: RecordType) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn settings(mut self, settings: RecordSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Attach the definition block; it runs on first use, not here
    pub fn build<F>(self, block: F) -> RecordType
    where
        F: FnOnce(&mut RecordBuilder) -> Result<()> + Send + 'static,
    {
        RecordType(Arc::new(RecordDefinition {
            name: self.name,
            settings: self.settings,
            reference: self.reference,
            block: Mutex::new(Some(Box::new(block))),
            compiled: OnceLock::new(),
        }))
    }
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn anonymous_builder() -> RecordTypeBuilder {
        RecordTypeBuilder::default()
    }

    pub fn new<F>(name: impl Into<String>, block: F) -> Self
    where
        F: FnOnce(&mut RecordBuilder) -> Result<()> + Send + 'static,
    {
        Self::builder(name).build(block)
    }

    pub fn anonymous<F>(block: F) -> Self
    where
        F: FnOnce(&mut RecordBuilder) -> Result<()> + Send + 'static,
    {
        Self::anonymous_builder().build(block)
    }

    /// Declared name; `None` for anonymous record types
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.name.is_none()
    }

    pub fn settings(&self) -> &RecordSettings {
        &self.0.settings
    }

    pub fn reference(&self) -> Option<&RecordType> {
        self.0.reference.as_ref()
    }

    /// Whether both handles point at the same definition
    pub fn same_as(&self, other: &RecordType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn label(&self) -> &str {
        self.name().unwrap_or("anonymous record")
    }

    fn compiled(&self) -> Result<&Compiled> {
        self.0
            .compiled
            .get_or_init(|| self.compile())
            .as_ref()
            .map_err(|e| SchemaError::InvalidDefinition(e.clone()))
    }

    fn compile(&self) -> std::result::Result<Compiled, DefinitionError> {
        let block = self.0.block.lock().take();
        let mut builder = RecordBuilder::new(
            self.label().to_string(),
            self.0.settings.clone(),
            self.0.reference.clone(),
        );

        let outcome = match block {
            Some(block) => match panic::catch_unwind(AssertUnwindSafe(|| block(&mut builder))) {
                Ok(result) => result.and_then(|()| builder.finish()),
                Err(payload) => Err(builder.definition_error(format!(
                    "definition block panicked: {}",
                    panic_message(payload.as_ref())
                ))),
            },
            None => Err(builder.definition_error("definition block is no longer available")),
        };

        match outcome {
            Ok(compiled) => {
                debug!(
                    record = self.label(),
                    fields = compiled.names.len(),
                    requirements = compiled.requirements.len(),
                    "compiled record type"
                );
                Ok(compiled)
            }
            Err(e) => {
                let error = match e {
                    SchemaError::InvalidDefinition(error) => error,
                    other => DefinitionError {
                        record: self.label().to_string(),
                        message: other.to_string(),
                    },
                };
                warn!(record = self.label(), error = %error, "record definition failed");
                Err(error)
            }
        }
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> Result<&[String]> {
        Ok(&self.compiled()?.names)
    }

    pub fn attribute(&self, name: &str) -> Result<Option<&Attribute>> {
        Ok(self.compiled()?.attribute(name))
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> Result<Vec<(&str, &Attribute)>> {
        Ok(self
            .compiled()?
            .fields()
            .map(|(name, attribute)| (name.as_str(), attribute))
            .collect())
    }

    pub fn requirements(&self) -> Result<&[Requirement]> {
        Ok(&self.compiled()?.requirements)
    }

    /// Load raw input into a record instance; null input is an error
    pub fn load_record(&self, raw: Value) -> Result<Record> {
        let path = ValuePath::root();
        match self.load(raw, &path)? {
            Value::Record(record) => Ok(record),
            other => Err(incompatible(&path, "hash", &other)),
        }
    }

    /// Validate a loaded value with a fresh resolver rooted at it
    pub fn validate_root(&self, value: &Value) -> Vec<String> {
        let scope = PathResolver::for_root(value.clone());
        self.validate_value(value, &ValuePath::root(), &scope)
    }

    /// Validate a value that should be a record of this type
    pub fn validate_value(&self, value: &Value, path: &ValuePath, scope: &PathResolver) -> Vec<String> {
        match value {
            Value::Record(record) => self.validate_record(record, path, scope),
            other => vec![format!(
                "Attribute {} received value of type {} but should have been {}.",
                path,
                other.kind(),
                self.name_or_record()
            )],
        }
    }

    fn validate_record(&self, record: &Record, path: &ValuePath, scope: &PathResolver) -> Vec<String> {
        let Some(_guard) = record.enter_validation() else {
            return Vec::new();
        };
        let compiled = match self.compiled() {
            Ok(compiled) => compiled,
            Err(e) => return vec![e.to_string()],
        };

        let values = record.to_map();
        let mut errors = Vec::new();
        for (name, attribute) in compiled.fields() {
            errors.extend(attribute.validate(values.get(name), &path.field(name), scope));
        }

        let present: BTreeSet<String> = values
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, _)| name.clone())
            .collect();
        for requirement in &compiled.requirements {
            errors.extend(requirement.validate(&present, path));
        }
        errors
    }

    pub(crate) fn dump_record(&self, record: &Record) -> serde_json::Value {
        let Some(_guard) = record.enter_dump() else {
            return json!("...");
        };
        let compiled = self.compiled().ok();
        let out: serde_json::Map<String, serde_json::Value> = record
            .to_map()
            .iter()
            .map(|(name, value)| {
                let dumped = match compiled.and_then(|c| c.attribute(name)) {
                    Some(attribute) => attribute.dump(value),
                    None => value.to_json(),
                };
                (name.clone(), dumped)
            })
            .collect();
        serde_json::Value::Object(out)
    }

    /// Generate an example record, reusing `known` values where present.
    ///
    /// Returns null once the context's depth limit is reached.
    pub fn example_with(&self, path: &ValuePath, known: &Map, ctx: &mut ExampleContext) -> Result<Value> {
        if ctx.exhausted() {
            return Ok(Value::Null);
        }
        let compiled = self.compiled()?;
        let known_names = known
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, _)| name.clone());
        let selected = AttributeSelector::new(&compiled.requirements, &compiled.names, known_names).process()?;

        ctx.descend();
        let raw = self.example_fields(compiled, &selected, path, known, ctx);
        ctx.ascend();

        self.load(Value::Hash(raw?), path)
    }

    fn example_fields(
        &self,
        compiled: &Compiled,
        selected: &[String],
        path: &ValuePath,
        known: &Map,
        ctx: &mut ExampleContext,
    ) -> Result<Map> {
        let mut raw = Map::new();
        for name in selected {
            let Some(attribute) = compiled.attribute(name) else {
                continue;
            };
            let value = match known.get(name) {
                Some(value) if !value.is_null() => value.clone(),
                _ => attribute.example(&path.field(name), ctx)?,
            };
            if !value.is_null() {
                raw.insert(name.clone(), value);
            }
        }
        Ok(raw)
    }

    fn load_map(&self, compiled: &Compiled, input: Map, path: &ValuePath) -> Result<Record> {
        let settings = &self.0.settings;
        let mut declared = Map::new();
        let mut spellings: HashMap<&str, String> = HashMap::new();
        let mut extras = Map::new();
        for (key, value) in input {
            match compiled.resolve_key(&key, settings.case_insensitive) {
                Some(name) => {
                    if let Some(first) = spellings.get(name) {
                        return Err(SchemaError::DuplicateKey {
                            first: first.clone(),
                            second: key,
                            field: name.to_string(),
                            path: path.to_string(),
                        });
                    }
                    spellings.insert(name, key.clone());
                    declared.insert(name.to_string(), value);
                }
                None if settings.allow_extra => {
                    extras.insert(key, value);
                }
                None => {
                    return Err(SchemaError::UnknownKey {
                        key,
                        path: path.to_string(),
                    })
                }
            }
        }

        if let Some(bucket) = &settings.extra_bucket {
            if !extras.is_empty() {
                let merged = merge_bucket(std::mem::take(&mut extras), declared.remove(bucket), &path.field(bucket))?;
                declared.insert(bucket.clone(), Value::Hash(merged));
            }
        }

        let record = Record::new(self.clone());
        for (name, attribute) in compiled.fields() {
            let raw = declared.remove(name);
            if let Some(value) = attribute.load(raw, &path.field(name), Some(&record))? {
                record.insert_loaded(name.clone(), value);
            }
        }
        for (key, value) in extras {
            let loaded = Object.load(value, &path.field(&key))?;
            record.insert_loaded(key, loaded);
        }

        trace!(record = self.label(), path = %path, "loaded record");
        Ok(record)
    }

    pub(crate) fn resolve_field(&self, key: &str) -> Result<Option<&Attribute>> {
        let compiled = self.compiled()?;
        Ok(compiled
            .resolve_key(key, self.0.settings.case_insensitive)
            .and_then(|name| compiled.attribute(name)))
    }

    pub(crate) fn canonical_name(&self, key: &str) -> Option<String> {
        let compiled = self.compiled().ok()?;
        compiled
            .resolve_key(key, self.0.settings.case_insensitive)
            .map(str::to_string)
    }

    fn name_or_record(&self) -> String {
        self.name().unwrap_or("Record").to_string()
    }

    fn settings_description(&self) -> BTreeMap<String, serde_json::Value> {
        let settings = &self.0.settings;
        let mut options = BTreeMap::new();
        if settings.allow_extra {
            options.insert("allow_extra".to_string(), json!(true));
        }
        if settings.case_insensitive {
            options.insert("case_insensitive".to_string(), json!(true));
        }
        if let Some(bucket) = &settings.extra_bucket {
            options.insert("extra".to_string(), json!(bucket));
        }
        if settings.allow_null_by_default {
            options.insert("allow_null_by_default".to_string(), json!(true));
        }
        if let Some(reference) = &self.0.reference {
            options.insert("reference".to_string(), json!(reference.id()));
        }
        options
    }

    /// Everything but the identity; hashed into anonymous ids
    fn describe_body(&self) -> TypeDescription {
        let mut description = TypeDescription::new(self.name_or_record(), Family::Hash, String::new());
        description.options = self.settings_description();
        if let Ok(compiled) = self.compiled() {
            description.attributes = Some(
                compiled
                    .fields()
                    .map(|(name, attribute)| attribute.describe(Some(name)))
                    .collect(),
            );
            description.requirements = Some(compiled.requirements.iter().map(Requirement::describe).collect());
        }
        description
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn merge_bucket(extras: Map, explicit: Option<Value>, path: &ValuePath) -> Result<Map> {
    let mut merged = extras;
    match explicit {
        None | Some(Value::Null) => {}
        Some(Value::Hash(map)) => merged.extend(map),
        Some(Value::Record(record)) => merged.extend(record.to_map()),
        Some(Value::String(text)) => match parse_json(&text, path, "Record")? {
            Value::Hash(map) => merged.extend(map),
            other => return Err(incompatible(path, "hash", &other)),
        },
        Some(other) => return Err(incompatible(path, "hash", &other)),
    }
    Ok(merged)
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.0.name)
            .field("settings", &self.0.settings)
            .field("compiled", &self.0.compiled.get().map(|c| c.is_ok()))
            .finish()
    }
}

impl Type for RecordType {
    fn name(&self) -> String {
        self.name_or_record()
    }

    fn family(&self) -> Family {
        Family::Hash
    }

    fn native_kind(&self) -> &'static str {
        "record"
    }

    fn id(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => format!("Record-{}", Checksum::from_json(&self.describe_body().to_json()).short()),
        }
    }

    fn check_type(&self, value: &Value) -> bool {
        matches!(value, Value::Record(record) if record.record_type().same_as(self))
    }

    fn load(&self, raw: Value, path: &ValuePath) -> Result<Value> {
        let compiled = self.compiled()?;
        let input = match raw {
            Value::Null => return Ok(Value::Null),
            Value::Record(record) if record.record_type().same_as(self) => return Ok(Value::Record(record)),
            Value::Record(record) => record.to_map(),
            Value::Hash(map) => map,
            Value::String(text) => match parse_json(&text, path, &self.name_or_record())? {
                Value::Hash(map) => map,
                other => return Err(incompatible(path, "hash", &other)),
            },
            other => return Err(incompatible(path, "hash", &other)),
        };
        self.load_map(compiled, input, path).map(Value::Record)
    }

    fn dump(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::Record(record) => record.dump(),
            other => other.to_json(),
        }
    }

    fn validate(&self, value: &Value, path: &ValuePath, _options: &Options, scope: &PathResolver) -> Vec<String> {
        self.validate_value(value, path, scope)
    }

    fn example(&self, path: &ValuePath, _options: &Options, ctx: &mut ExampleContext) -> Result<Value> {
        self.example_with(path, &Map::new(), ctx)
    }

    fn describe(&self, shallow: bool) -> TypeDescription {
        if shallow {
            let mut description = TypeDescription::new(self.name_or_record(), Family::Hash, self.id());
            description.options = self.settings_description();
            return description;
        }
        let mut description = self.describe_body();
        description.id = self.id();
        description
    }

    /// Derive an anonymous record from this one; its block may `inherit` fields
    fn construct(&self, block: RecordBlock) -> Result<TypeRef> {
        let derived = RecordType::anonymous_builder()
            .settings(self.0.settings.clone())
            .reference(self.clone())
            .build(block);
        Ok(Arc::new(derived))
    }

    fn as_record(&self) -> Option<&RecordType> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Condition;
    use crate::resolver::Predicate;
    use crate::types;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn person() -> RecordType {
        RecordType::new("Person", |r| {
            r.field("name", types::string(), Options::new().required())?;
            r.field("age", types::integer(), Options::new().with_default(30i64))?;
            r.field("email", types::string(), Options::new())?;
            Ok(())
        })
    }

    #[test]
    fn test_load_applies_defaults_and_skips_absent() {
        let record = person().load_record(Value::from(json!({"name": "Ada"}))).unwrap();
        assert_eq!(record.get("age"), Some(Value::Integer(30)));
        assert!(!record.contains("email"));
        assert_eq!(record.field_names(), vec!["age", "name"]);
    }

    #[test]
    fn test_load_is_idempotent() {
        let person = person();
        let loaded = person.load(Value::from(json!({"name": "Ada"})), &ValuePath::root()).unwrap();
        let again = person.load(loaded.clone(), &ValuePath::root()).unwrap();
        assert_eq!(loaded, again);
    }

    #[test]
    fn test_load_rejects_unknown_key() {
        let err = person()
            .load(Value::from(json!({"name": "Ada", "nick": "A"})), &ValuePath::root())
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown key received: nick for $");
    }

    #[test]
    fn test_load_rejects_non_hash() {
        let err = person().load(Value::Integer(3), &ValuePath::root()).unwrap_err();
        assert!(matches!(err, SchemaError::IncompatibleType { .. }));
        let err = person().load(Value::from("{broken"), &ValuePath::root()).unwrap_err();
        assert!(matches!(err, SchemaError::Deserialization { .. }));
    }

    #[test]
    fn test_case_insensitive_keys() {
        let contact = RecordType::builder("Contact").case_insensitive(true).build(|r| {
            r.field("Name", types::string(), Options::new())?;
            Ok(())
        });
        let record = contact.load_record(Value::from(json!({"NAME": "Ada"}))).unwrap();
        assert_eq!(record.get("Name"), Some(Value::from("Ada")));
    }

    #[test]
    fn test_case_insensitive_collision_is_rejected() {
        let contact = RecordType::builder("Contact").case_insensitive(true).build(|r| {
            r.field("Name", types::string(), Options::new())?;
            Ok(())
        });
        let err = contact
            .load(Value::from(json!({"name": "ada", "NAME": "Ada"})), &ValuePath::root())
            .unwrap_err();
        match err {
            SchemaError::DuplicateKey { first, second, field, path } => {
                assert_eq!(field, "Name");
                assert_eq!(path, "$");
                let mut keys = vec![first, second];
                keys.sort();
                assert_eq!(keys, vec!["NAME", "name"]);
            }
            other => panic!("Expected DuplicateKey, got {:?}", other),
        }
    }

    #[test]
    fn test_generated_default_reads_loaded_siblings() {
        let badge = RecordType::new("Badge", |r| {
            r.field("first", types::string(), Options::new())?;
            r.field(
                "label",
                types::string(),
                Options::new().with_default_fn(|parent, _| {
                    parent
                        .and_then(|record| record.get("first"))
                        .unwrap_or(Value::Null)
                }),
            )?;
            Ok(())
        });
        let record = badge.load_record(Value::from(json!({"first": "Ada"}))).unwrap();
        assert_eq!(record.get("label"), Some(Value::from("Ada")));

        let explicit = badge
            .load_record(Value::from(json!({"first": "Ada", "label": "Countess"})))
            .unwrap();
        assert_eq!(explicit.get("label"), Some(Value::from("Countess")));
    }

    #[test]
    fn test_extra_fields_top_level_and_bucket() {
        let open = RecordType::builder("Open").allow_extra(true).build(|r| {
            r.field("id", types::integer(), Options::new())?;
            Ok(())
        });
        let record = open.load_record(Value::from(json!({"id": 1, "note": "hi"}))).unwrap();
        assert_eq!(record.get("note"), Some(Value::from("hi")));

        let bucketed = RecordType::builder("Bucketed").extra_bucket("extra").build(|r| {
            r.field("id", types::integer(), Options::new())?;
            Ok(())
        });
        let record = bucketed
            .load_record(Value::from(json!({"id": 1, "a": 1, "b": 2, "extra": {"b": 20, "c": 30}})))
            .unwrap();
        let extra = record.get("extra").unwrap();
        assert_eq!(extra.get("a"), Some(Value::Integer(1)));
        assert_eq!(extra.get("b"), Some(Value::Integer(20)));
        assert_eq!(extra.get("c"), Some(Value::Integer(30)));
        assert!(!record.contains("a"));
    }

    #[test]
    fn test_block_runs_once() {
        static RUNS: AtomicUsize = AtomicUsize::new(0);
        let counted = RecordType::new("Counted", |r| {
            RUNS.fetch_add(1, Ordering::SeqCst);
            r.field("x", types::integer(), Options::new())?;
            Ok(())
        });
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counted = counted.clone();
                std::thread::spawn(move || counted.field_names().map(|names| names.len()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 1);
        }
        assert_eq!(RUNS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_definition_is_cached() {
        let broken = RecordType::new("Broken", |r| {
            r.field("a", types::string(), Options::new())?;
            r.requires(Requirement::all(["missing"]));
            Ok(())
        });
        let first = broken.field_names().unwrap_err().to_string();
        let second = broken.load(Value::from(json!({})), &ValuePath::root()).unwrap_err().to_string();
        assert_eq!(first, second);
        assert!(first.contains("missing"));
    }

    #[test]
    fn test_panicking_definition_is_cached() {
        let exploding = RecordType::new("Exploding", |_| panic!("boom"));
        let first = exploding.field_names().unwrap_err().to_string();
        let second = exploding.field_names().unwrap_err().to_string();
        assert_eq!(first, second);
        assert!(first.contains("boom"), "{}", first);
    }

    #[test]
    fn test_condition_reads_registered_scope_value() {
        let request = RecordType::new("Request", |r| {
            r.field("id", types::integer(), Options::new())?;
            r.field(
                "token",
                types::string(),
                Options::new().required_if(Condition::matching("$.params.strict", Predicate::Bool(true))),
            )?;
            Ok(())
        });
        let value = request.load(Value::from(json!({"id": 1})), &ValuePath::root()).unwrap();

        let mut strict = PathResolver::for_root(value.clone());
        strict.register("params", Value::from(json!({"strict": true}))).unwrap();
        assert_eq!(
            request.validate_value(&value, &ValuePath::root(), &strict),
            vec!["Attribute $.token is required when $.params.strict (from $) matches true."]
        );

        let mut lenient = PathResolver::for_root(value.clone());
        lenient.register("params", Value::from(json!({"strict": false}))).unwrap();
        assert!(request.validate_value(&value, &ValuePath::root(), &lenient).is_empty());
    }

    #[test]
    fn test_validate_fields_then_requirements() {
        let account = RecordType::new("Account", |r| {
            r.field("email", types::string(), Options::new())?;
            r.field("phone", types::string(), Options::new())?;
            r.requires(Requirement::at_least(1, ["email", "phone"]));
            Ok(())
        });
        let empty = account.load(Value::from(json!({})), &ValuePath::root()).unwrap();
        let errors = account.validate_root(&empty);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("At least 1 keys"));

        let ok = account.load(Value::from(json!({"phone": "555"})), &ValuePath::root()).unwrap();
        assert!(account.validate_root(&ok).is_empty());
    }

    #[test]
    fn test_dump_round_trip() {
        let person = person();
        let loaded = person
            .load(Value::from(json!({"name": "Ada", "email": "ada@example.com"})), &ValuePath::root())
            .unwrap();
        let dumped = person.dump(&loaded);
        assert_eq!(dumped, json!({"name": "Ada", "age": 30, "email": "ada@example.com"}));
        let reloaded = person.load(Value::from(dumped), &ValuePath::root()).unwrap();
        assert_eq!(reloaded, loaded);
    }

    #[test]
    fn test_anonymous_id_is_stable() {
        let make = || {
            RecordType::anonymous(|r| {
                r.field("x", types::integer(), Options::new())?;
                Ok(())
            })
        };
        let (a, b) = (make(), make());
        assert!(a.id().starts_with("Record-"));
        assert_eq!(a.id(), b.id());
        assert_eq!(a.name(), None);
    }

    #[test]
    fn test_example_satisfies_requirements() {
        let contact = RecordType::new("Contact", |r| {
            r.field("email", types::string(), Options::new())?;
            r.field("phone", types::string(), Options::new())?;
            r.field("fax", types::string(), Options::new())?;
            r.requires(Requirement::exclusive(["email", "phone", "fax"]));
            Ok(())
        });
        let mut ctx = ExampleContext::seeded(9);
        let value = contact.example_with(&ValuePath::root(), &Map::new(), &mut ctx).unwrap();
        assert!(contact.validate_root(&value).is_empty());
        let record = value.as_record().unwrap();
        assert_eq!(record.field_names(), vec!["email"]);
    }
}
