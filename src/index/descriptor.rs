//! Index declarations
//!
//! A descriptor is a declarative statement of a desired index. Two
//! descriptors are interchangeable exactly when they compare equal.

use serde::{Deserialize, Serialize};

use super::errors::{IndexError, IndexResult};

/// Kind of index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKind {
    /// Sorted mapping from field value to document ids
    Value,
    /// Inverted index over the tokens of text fields
    FullText,
}

impl IndexKind {
    /// Lowercase name used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Value => "value",
            IndexKind::FullText => "fullText",
        }
    }
}

/// Per-index options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    /// Fold diacritics before tokenizing (full-text only). Off by default,
    /// so "café" and "cafe" are distinct tokens.
    #[serde(default)]
    pub ignore_accents: bool,
}

/// Named index over one or more dotted field paths
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Unique name within a store
    pub name: String,
    /// Index kind
    pub kind: IndexKind,
    /// Dotted field paths, e.g. `address.city`
    pub fields: Vec<String>,
    /// Options
    #[serde(default)]
    pub options: IndexOptions,
}

impl IndexDescriptor {
    /// Value index over `fields`; multiple fields form a composite key.
    pub fn value<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: IndexKind::Value,
            fields: fields.into_iter().map(Into::into).collect(),
            options: IndexOptions::default(),
        }
    }

    /// Full-text index over `fields`.
    pub fn full_text<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: IndexKind::FullText,
            fields: fields.into_iter().map(Into::into).collect(),
            options: IndexOptions::default(),
        }
    }

    /// Sets accent folding.
    pub fn ignore_accents(mut self, ignore: bool) -> Self {
        self.options.ignore_accents = ignore;
        self
    }

    /// Checks that the descriptor can back an index.
    pub fn validate(&self) -> IndexResult<()> {
        if self.name.trim().is_empty() {
            return Err(IndexError::invalid(&self.name, "name is empty"));
        }
        if self.fields.is_empty() {
            return Err(IndexError::invalid(&self.name, "no fields"));
        }
        if let Some(bad) = self
            .fields
            .iter()
            .find(|f| f.is_empty() || f.split('.').any(str::is_empty))
        {
            return Err(IndexError::invalid(
                &self.name,
                format!("malformed field path {:?}", bad),
            ));
        }
        if self.kind == IndexKind::FullText && self.fields.len() > usize::from(u16::MAX) {
            return Err(IndexError::invalid(&self.name, "too many fields"));
        }
        Ok(())
    }
}
