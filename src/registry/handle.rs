use std::fmt;
use std::sync::{Arc, Weak};

use super::handle_registry::RegistryInner;
use crate::document::{Document, DocumentStore, QueryResults, Revision, Snapshot};
use crate::error::Result;
use crate::index::{IndexDescriptor, Predicate};
use crate::storage::StorageResult;

/// One reference to an open database.
///
/// Not `Clone`: every holder acquires its own handle from the registry.
/// Dropping the handle releases it; the last release closes the store.
pub struct Handle {
    name: String,
    store: Arc<DocumentStore>,
    registry: Weak<RegistryInner>,
}

impl Handle {
    pub(super) fn new(name: String, store: Arc<DocumentStore>, registry: Weak<RegistryInner>) -> Self {
        Self {
            name,
            store,
            registry,
        }
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether two handles share the same open store
    pub fn same_store(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<Document>> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &str) -> StorageResult<bool> {
        self.store.contains(id)
    }

    pub fn len(&self) -> StorageResult<usize> {
        self.store.len()
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        self.store.is_empty()
    }

    pub fn ids(&self) -> StorageResult<Vec<String>> {
        self.store.ids()
    }

    pub fn all(&self) -> StorageResult<Vec<Document>> {
        self.store.all()
    }

    /// Consistent read view; see [`DocumentStore::snapshot`] for what not
    /// to call while holding it.
    pub fn snapshot(&self) -> StorageResult<Snapshot<'_>> {
        self.store.snapshot()
    }

    pub fn put(&self, doc: Document) -> Result<Revision> {
        self.store.put(doc)
    }

    pub fn put_all(&self, docs: Vec<Document>) -> Result<Vec<Revision>> {
        self.store.put_all(docs)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id)
    }

    pub fn create_index(&self, descriptor: IndexDescriptor) -> Result<bool> {
        self.store.create_index(descriptor)
    }

    pub fn drop_index(&self, name: &str) -> Result<IndexDescriptor> {
        self.store.drop_index(name)
    }

    pub fn list_indexes(&self) -> StorageResult<Vec<IndexDescriptor>> {
        self.store.list_indexes()
    }

    pub fn query(&self, index_name: &str, predicate: impl Into<Predicate>) -> Result<QueryResults> {
        self.store.query(index_name, predicate)
    }

    pub fn compact(&self) -> Result<u64> {
        self.store.compact()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("name", &self.name).finish()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(&self.name, &self.store);
        }
    }
}
