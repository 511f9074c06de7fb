//! Familiar Records
//!
//! Schema-driven loading, validation, dumping, description and example
//! generation for structured records.
//!
//! ## Features
//!
//! - **Typed Loading**: raw JSON is coerced field by field into canonical values
//! - **Validation**: business-rule failures are collected, never raised
//! - **Requirements**: declarative cross-field constraints (`all`, `exclusive`, ...)
//! - **Example Generation**: valid sample records that satisfy every requirement
//! - **Descriptors**: record types declared in JSON and compiled through a registry
//!
//! ## Architecture
//!
//! ```text
//! Type ─┬─ primitives (String, Integer, Float, Boolean, DateTime, Object)
//!       ├─ Collection ── member Attribute
//!       └─ RecordType ── Attribute* + Requirement*
//!                         │
//!          load ──────────┤ coerce input, reject unknown keys, apply defaults
//!          validate ──────┤ per-field rules, then requirements (PathResolver)
//!          dump ──────────┤ canonical values back to JSON
//!          example ───────┘ AttributeSelector picks fields, attributes fill them
//! ```

pub mod attribute;
pub mod checksum;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod example;
pub mod options;
pub mod path;
pub mod record;
pub mod requirement;
pub mod resolver;
pub mod selector;
pub mod types;
pub mod value;

pub use attribute::{Attribute, AttributeDescription};
pub use checksum::Checksum;
pub use config::EngineConfig;
pub use descriptor::{DescriptorLoader, RecordDescriptor};
pub use error::{DefinitionError, Result, SchemaError};
pub use example::ExampleContext;
pub use options::{Condition, DefaultValue, ExampleSpec, Options};
pub use path::ValuePath;
pub use record::{Record, RecordBuilder, RecordSettings, RecordType};
pub use requirement::{Requirement, RequirementKind};
pub use resolver::{PathResolver, Predicate};
pub use selector::AttributeSelector;
pub use types::{Family, Type, TypeDescription, TypeRef, TypeRegistry};
pub use value::{Map, Value};
