//! Cross-field requirements

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::ValuePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    All,
    Exactly,
    AtLeast,
    AtMost,
    Exclusive,
}

/// Declarative constraint over a group of field names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    kind: RequirementKind,
    count: Option<usize>,
    attributes: Vec<String>,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementDescription {
    #[serde(rename = "type")]
    pub kind: RequirementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub attributes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Requirement {
    fn new<I, S>(kind: RequirementKind, count: Option<usize>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            count,
            attributes: attributes.into_iter().map(Into::into).collect(),
            description: None,
        }
    }

    pub fn all<I: IntoIterator<Item = S>, S: Into<String>>(attributes: I) -> Self {
        Self::new(RequirementKind::All, None, attributes)
    }

    pub fn exactly<I: IntoIterator<Item = S>, S: Into<String>>(count: usize, attributes: I) -> Self {
        Self::new(RequirementKind::Exactly, Some(count), attributes)
    }

    pub fn at_least<I: IntoIterator<Item = S>, S: Into<String>>(count: usize, attributes: I) -> Self {
        Self::new(RequirementKind::AtLeast, Some(count), attributes)
    }

    pub fn at_most<I: IntoIterator<Item = S>, S: Into<String>>(count: usize, attributes: I) -> Self {
        Self::new(RequirementKind::AtMost, Some(count), attributes)
    }

    pub fn exclusive<I: IntoIterator<Item = S>, S: Into<String>>(attributes: I) -> Self {
        Self::new(RequirementKind::Exclusive, None, attributes)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> RequirementKind {
        self.kind
    }

    /// Group size parameter; `None` for `all` and `exclusive`
    pub fn count(&self) -> Option<usize> {
        self.count
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Check the group against the set of field names present on an instance
    pub fn validate(&self, present: &BTreeSet<String>, context: &ValuePath) -> Vec<String> {
        let found: Vec<&String> = self
            .attributes
            .iter()
            .filter(|name| present.contains(name.as_str()))
            .collect();
        let count = self.count.unwrap_or(0);

        match self.kind {
            RequirementKind::All => self
                .attributes
                .iter()
                .filter(|name| !present.contains(name.as_str()))
                .map(|name| format!("Key {} is required for {}.", name, context))
                .collect(),
            RequirementKind::Exactly if found.len() != count => vec![format!(
                "Exactly {} of the following keys {} are required for {}. Found {} instead: {}",
                count,
                list(&self.attributes),
                context,
                found.len(),
                list(&found)
            )],
            RequirementKind::AtLeast if found.len() < count => vec![format!(
                "At least {} keys out of {} are required to be passed in for {}. Found {}",
                count,
                list(&self.attributes),
                context,
                list(&found)
            )],
            RequirementKind::AtMost if found.len() > count => vec![format!(
                "At most {} keys out of {} can be passed in for {}. Found {}",
                count,
                list(&self.attributes),
                context,
                list(&found)
            )],
            RequirementKind::Exclusive if found.len() > 1 => vec![format!(
                "Keys {} are mutually exclusive for {}.",
                list(&found),
                context
            )],
            _ => Vec::new(),
        }
    }

    pub fn describe(&self) -> RequirementDescription {
        RequirementDescription {
            kind: self.kind,
            count: self.count,
            attributes: self.attributes.clone(),
            description: self.description.clone(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes = list(&self.attributes);
        match self.kind {
            RequirementKind::All => write!(f, "all of {}", attributes),
            RequirementKind::Exclusive => write!(f, "at most one of {}", attributes),
            RequirementKind::Exactly => {
                write!(f, "exactly {} of {}", self.count.unwrap_or(0), attributes)
            }
            RequirementKind::AtLeast => {
                write!(f, "at least {} of {}", self.count.unwrap_or(0), attributes)
            }
            RequirementKind::AtMost => {
                write!(f, "at most {} of {}", self.count.unwrap_or(0), attributes)
            }
        }
    }
}

fn list<S: AsRef<str>>(names: &[S]) -> String {
    let joined: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
    format!("[{}]", joined.join(", "))
}
