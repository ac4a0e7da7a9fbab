//! Index Manager
//!
//! Owns every named index of one store and keeps them consistent with it.
//!
//! # API
//!
//! - `create_index(descriptor, documents)` - Build and register an index
//! - `drop_index(name)` - Remove an index
//! - `on_document_changed(id, before, after)` - Apply one put or delete
//! - `query(name, predicate)` - Evaluate a predicate against one index
//!
//! Updates are incremental: a write touches only the buckets and postings
//! of the changed document, never the whole corpus.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use super::btree::{composite_key, CompositeKey, IndexKey, ValueIndex};
use super::descriptor::{IndexDescriptor, IndexKind};
use super::errors::{IndexError, IndexResult};
use super::fulltext::{Analyzer, FullTextIndex, FullTextMatches};
use super::predicate::Predicate;
use crate::document::Document;

/// An id produced by a query, with its full-text score if any
pub type IndexHit = (String, Option<u32>);

enum IndexState {
    Value(ValueIndex),
    FullText(FullTextIndex),
}

struct ManagedIndex {
    descriptor: IndexDescriptor,
    state: IndexState,
}

impl ManagedIndex {
    fn build<'a, I>(descriptor: IndexDescriptor, documents: I) -> Self
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let state = match descriptor.kind {
            IndexKind::Value => IndexState::Value(ValueIndex::new()),
            IndexKind::FullText => IndexState::FullText(FullTextIndex::new(Analyzer::new(
                descriptor.options.ignore_accents,
            ))),
        };
        let mut index = Self { descriptor, state };
        for doc in documents {
            index.apply(doc.id(), None, Some(doc));
        }
        index
    }

    fn apply(&mut self, id: &str, before: Option<&Document>, after: Option<&Document>) {
        let fields = &self.descriptor.fields;

        match &mut self.state {
            IndexState::Value(tree) => {
                let old = before.and_then(|d| composite_key(d, fields));
                let new = after.and_then(|d| composite_key(d, fields));
                if old == new {
                    return;
                }
                if let Some(old) = old {
                    tree.remove(&old, id);
                }
                if let Some(new) = new {
                    tree.insert(new, id);
                }
            }
            IndexState::FullText(inverted) => {
                let Some(after) = after else {
                    inverted.remove_document(id);
                    return;
                };
                for (slot, path) in fields.iter().enumerate() {
                    // validated: full-text field count fits in u16
                    let slot = slot as u16;
                    let old = before.map(|d| field_texts(d, path)).unwrap_or_default();
                    let new = field_texts(after, path);
                    if old == new {
                        continue;
                    }
                    if new.is_empty() {
                        inverted.remove_field(id, slot);
                    } else {
                        inverted.index_field(id, slot, &new);
                    }
                }
            }
        }
    }
}

/// Text of a field for full-text indexing: a string, or the strings of an
/// array. Anything else contributes nothing.
fn field_texts<'a>(doc: &'a Document, path: &str) -> Vec<&'a str> {
    match doc.get(path) {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Index Manager holding every index of one store, keyed by name
#[derive(Default)]
pub struct IndexManager {
    indexes: BTreeMap<String, ManagedIndex>,
}

impl IndexManager {
    /// Creates a manager with no indexes
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index over `documents` and registers it.
    ///
    /// Re-issuing a descriptor equal to the registered one is a no-op and
    /// returns `Ok(false)`. A different descriptor under the same name is
    /// `DuplicateName`.
    pub fn create_index<'a, I>(&mut self, descriptor: IndexDescriptor, documents: I) -> IndexResult<bool>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        descriptor.validate()?;

        if let Some(existing) = self.indexes.get(&descriptor.name) {
            if existing.descriptor == descriptor {
                return Ok(false);
            }
            return Err(IndexError::DuplicateName(descriptor.name));
        }

        let name = descriptor.name.clone();
        let index = ManagedIndex::build(descriptor, documents);

        match &index.state {
            IndexState::Value(tree) => info!(
                index = %name,
                kind = "value",
                keys = tree.key_count(),
                documents = tree.entry_count(),
                "index created"
            ),
            IndexState::FullText(inverted) => info!(
                index = %name,
                kind = "fullText",
                tokens = inverted.token_count(),
                documents = inverted.document_count(),
                ignore_accents = inverted.analyzer().ignores_accents(),
                "index created"
            ),
        }

        self.indexes.insert(name, index);
        Ok(true)
    }

    /// Removes an index, returning its descriptor.
    pub fn drop_index(&mut self, name: &str) -> IndexResult<IndexDescriptor> {
        let index = self
            .indexes
            .remove(name)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;
        info!(index = %name, "index dropped");
        Ok(index.descriptor)
    }

    /// Applies one document change to every index.
    ///
    /// `before` is the stored document prior to the write (`None` on
    /// insert), `after` the stored document after it (`None` on delete).
    pub fn on_document_changed(&mut self, id: &str, before: Option<&Document>, after: Option<&Document>) {
        for index in self.indexes.values_mut() {
            index.apply(id, before, after);
        }
        debug!(document = %id, indexes = self.indexes.len(), "indexes updated");
    }

    /// Descriptors of every index, sorted by name
    pub fn descriptors(&self) -> Vec<IndexDescriptor> {
        self.indexes.values().map(|i| i.descriptor.clone()).collect()
    }

    /// Descriptor of one index
    pub fn descriptor(&self, name: &str) -> Option<&IndexDescriptor> {
        self.indexes.get(name).map(|i| &i.descriptor)
    }

    /// Number of indexes
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// The full-text index registered as `name`
    pub fn full_text(&self, name: &str) -> IndexResult<&FullTextIndex> {
        match &self.get(name)?.state {
            IndexState::FullText(inverted) => Ok(inverted),
            IndexState::Value(_) => Err(IndexError::UnsupportedPredicate {
                name: name.to_string(),
                kind: IndexKind::Value.as_str(),
                predicate: "match",
            }),
        }
    }

    /// The value index registered as `name`
    pub fn value(&self, name: &str) -> IndexResult<&ValueIndex> {
        match &self.get(name)?.state {
            IndexState::Value(tree) => Ok(tree),
            IndexState::FullText(_) => Err(IndexError::UnsupportedPredicate {
                name: name.to_string(),
                kind: IndexKind::FullText.as_str(),
                predicate: "eq",
            }),
        }
    }

    /// Evaluates `predicate` against index `name`.
    ///
    /// Value predicates yield ids in key order, then ascending id, with no
    /// score. Full-text predicates yield ids best first with their score.
    pub fn query(&self, name: &str, predicate: &Predicate) -> IndexResult<Vec<IndexHit>> {
        let index = self.get(name)?;

        match (&index.state, predicate) {
            (IndexState::Value(tree), Predicate::Eq(values)) => {
                let ids = match self.keys_for(index, values)? {
                    Some(key) => tree.lookup_eq(&key),
                    None => Vec::new(),
                };
                Ok(ids.into_iter().map(|id| (id, None)).collect())
            }
            (IndexState::Value(tree), Predicate::Range { min, max }) => {
                let min = match min {
                    Some(values) => match self.keys_for(index, values)? {
                        Some(key) => Some(key),
                        None => return Ok(Vec::new()),
                    },
                    None => None,
                };
                let max = match max {
                    Some(values) => match self.keys_for(index, values)? {
                        Some(key) => Some(key),
                        None => return Ok(Vec::new()),
                    },
                    None => None,
                };
                let ids = tree.lookup_range(min.as_deref(), max.as_deref());
                Ok(ids.into_iter().map(|id| (id, None)).collect())
            }
            (IndexState::FullText(inverted), Predicate::Match(text)) => {
                Ok(scored(inverted.query(text)))
            }
            (IndexState::FullText(inverted), Predicate::Phrase(text)) => {
                Ok(scored(inverted.query_phrase(text)))
            }
            (_, predicate) => Err(IndexError::UnsupportedPredicate {
                name: name.to_string(),
                kind: index.descriptor.kind.as_str(),
                predicate: predicate.name(),
            }),
        }
    }

    fn get(&self, name: &str) -> IndexResult<&ManagedIndex> {
        self.indexes
            .get(name)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))
    }

    /// Converts predicate values to a composite key. `Ok(None)` means a
    /// value can never be indexed, so nothing matches.
    fn keys_for(&self, index: &ManagedIndex, values: &[Value]) -> IndexResult<Option<CompositeKey>> {
        let expected = index.descriptor.fields.len();
        if values.len() != expected {
            return Err(IndexError::ArityMismatch {
                name: index.descriptor.name.clone(),
                expected,
                actual: values.len(),
            });
        }
        Ok(values.iter().map(IndexKey::from_json).collect())
    }
}

fn scored(matches: FullTextMatches) -> Vec<IndexHit> {
    matches
        .into_iter()
        .map(|(id, score)| (id, Some(score)))
        .collect()
}
