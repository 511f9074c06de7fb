//! Error types for record loading and schema definition

use thiserror::Error;

/// Result type for record operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Record engine errors
///
/// Structural failures (`IncompatibleType`, `Coercion`, `Deserialization`,
/// `UnknownKey`) abort a `load`. Schema-authoring failures
/// (`InvalidDefinition`, `InvalidOption`, `UnfeasibleRequirements`) are
/// programmer errors. Business-rule failures are never raised; `validate`
/// returns them as a list of messages.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Incompatible type at {path}: expected {expected}, got {actual}")]
    IncompatibleType {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Cannot coerce {value} into {target} at {path}")]
    Coercion {
        path: String,
        value: String,
        target: String,
    },

    #[error("Cannot deserialize {source_kind} as {encoding} at {path} ({reason}): {excerpt}")]
    Deserialization {
        path: String,
        source_kind: String,
        encoding: &'static str,
        excerpt: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidDefinition(#[from] DefinitionError),

    #[error("Unknown key received: {key} for {path}")]
    UnknownKey { key: String, path: String },

    #[error("Keys {first} and {second} both name field {field} for {path}")]
    DuplicateKey {
        first: String,
        second: String,
        field: String,
        path: String,
    },

    #[error("Unfeasible requirements: {0}")]
    UnfeasibleRequirements(String),

    #[error("Invalid option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("Resolver error: {0}")]
    Resolver(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a record definition block.
///
/// Cached by the record type after the first attempt, so every later access
/// surfaces the same error without running the block again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid definition for {record}: {message}")]
pub struct DefinitionError {
    pub record: String,
    pub message: String,
}
