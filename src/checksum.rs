//! Content fingerprints for describe trees

use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 fingerprint of a record shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Fingerprint a JSON tree.
    ///
    /// serde_json objects keep their keys sorted, so equal trees always
    /// serialize to the same bytes.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let canonical = serde_json::to_string(value).unwrap_or_default();
        Self::from_bytes(canonical.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, enough to tell shapes apart in type ids
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
