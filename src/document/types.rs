//! Document and revision types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Marker for optimistic conflict detection.
///
/// Rendered as `<generation>-<digest>`, e.g. `3-1a2b3c4d`. The generation
/// increases with every write to the same id; the digest is the CRC32 of
/// the stored body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision {
    generation: u64,
    digest: u32,
}

impl Revision {
    /// Create a revision from its parts
    pub fn new(generation: u64, digest: u32) -> Self {
        Self { generation, digest }
    }

    /// Write count for this id, starting at 1
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// CRC32 of the stored body
    pub fn digest(&self) -> u32 {
        self.digest
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:08x}", self.generation, self.digest)
    }
}

impl FromStr for Revision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (generation, digest) = s
            .split_once('-')
            .ok_or_else(|| format!("malformed revision: {:?}", s))?;
        let generation = generation
            .parse::<u64>()
            .map_err(|e| format!("bad revision generation {:?}: {}", generation, e))?;
        let digest = u32::from_str_radix(digest, 16)
            .map_err(|e| format!("bad revision digest {:?}: {}", digest, e))?;
        Ok(Self { generation, digest })
    }
}

impl Serialize for Revision {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A structured record stored by value under a unique id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<Revision>,
    body: Map<String, Value>,
}

impl Document {
    /// New document with a generated UUID id.
    pub fn new(body: Map<String, Value>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), body)
    }

    /// New document with a caller-chosen id.
    pub fn with_id(id: impl Into<String>, body: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            revision: None,
            body,
        }
    }

    /// Builds a document from a JSON value, which must be an object.
    pub fn from_json(id: impl Into<String>, value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(body) => Ok(Self::with_id(id, body)),
            other => Err(other),
        }
    }

    /// Sets the revision the next `put` is conditional on.
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Clears the revision, making the next `put` unconditional.
    pub fn without_revision(mut self) -> Self {
        self.revision = None;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.body
    }

    /// Sets a top-level field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.body.insert(field.into(), value.into());
        self
    }

    /// Resolves a dotted path such as `address.city`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.body, path)
    }

    pub(crate) fn set_revision(&mut self, revision: Revision) {
        self.revision = Some(revision);
    }
}

/// Resolves a dotted path against a JSON object.
pub fn lookup_path<'a>(body: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = body.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}
