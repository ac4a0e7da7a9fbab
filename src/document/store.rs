//! Document store
//!
//! Maps document ids to documents, backed by one append-only record file,
//! and keeps the store's indexes in step with every write.
//!
//! # Concurrency
//!
//! - Writers are serialized by one mutex per store, held across the append
//! - Documents and indexes live behind one `RwLock`; a writer takes it for
//!   write only to apply an already-durable change, so a reader sees either
//!   the whole write (document and index entries) or none of it
//! - Lock order is always writer mutex, then state lock
//!
//! # Durability
//!
//! A write is appended (and fsynced when `sync_writes` is set) before it
//! becomes visible. If the append fails, memory is left unchanged.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::Path;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::errors::ConflictError;
use super::results::{QueryHit, QueryResults};
use super::types::{Document, Revision};
use crate::error::{Error, Result};
use crate::index::{IndexDescriptor, IndexError, IndexManager, Predicate};
use crate::storage::{
    compute_checksum, DocumentRecord, FileHandle, StorageError, StorageReader, StorageResult,
    StorageWriter,
};

struct StoreState {
    documents: BTreeMap<String, Document>,
    /// Last generation of deleted ids, so a re-created id keeps counting up
    tombstones: HashMap<String, u64>,
    indexes: IndexManager,
    closed: bool,
}

/// An open database: documents, their revisions and their indexes
pub struct DocumentStore {
    name: String,
    files: FileHandle,
    sync_writes: bool,
    /// `None` once closed
    writer: Mutex<Option<StorageWriter>>,
    state: RwLock<StoreState>,
}

impl DocumentStore {
    /// Opens a store with fsync after every write.
    pub fn open(files: FileHandle) -> StorageResult<Self> {
        Self::open_with(files, true)
    }

    /// Loads documents and index declarations from disk and rebuilds the
    /// indexes.
    ///
    /// Fails with `SEEDDB_CORRUPT_FILE` if any record, body or declaration
    /// is invalid.
    pub fn open_with(files: FileHandle, sync_writes: bool) -> StorageResult<Self> {
        let data_path = files.data_path();
        let mut reader = StorageReader::open(&data_path).map_err(|e| {
            warn!(database = %files.name(), error = %e, "failed to read data file");
            e
        })?;

        let mut documents = BTreeMap::new();
        let mut tombstones = HashMap::new();

        loop {
            let offset = reader.current_offset();
            let record = match reader.read_next() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    warn!(database = %files.name(), error = %e, "corrupt data file");
                    return Err(e);
                }
            };

            if record.is_tombstone {
                documents.remove(&record.document_id);
                tombstones.insert(record.document_id, record.generation);
                continue;
            }

            if compute_checksum(&record.body) != record.digest {
                return Err(StorageError::corruption_at_offset(
                    offset,
                    format!("Revision digest mismatch for document {}", record.document_id),
                ));
            }
            let body: Map<String, Value> = serde_json::from_slice(&record.body).map_err(|e| {
                StorageError::corruption_at_offset(
                    offset,
                    format!("Invalid body for document {}: {}", record.document_id, e),
                )
            })?;

            let mut doc = Document::with_id(record.document_id.clone(), body);
            doc.set_revision(Revision::new(record.generation, record.digest));
            tombstones.remove(&record.document_id);
            documents.insert(record.document_id, doc);
        }

        let mut indexes = IndexManager::new();
        for descriptor in load_descriptors(&files.index_path())? {
            indexes
                .create_index(descriptor, documents.values())
                .map_err(|e| {
                    StorageError::corrupt_file(format!("Invalid index declaration: {}", e))
                })?;
        }

        let writer = StorageWriter::open(&data_path, sync_writes)?;

        info!(
            database = %files.name(),
            documents = documents.len(),
            indexes = indexes.len(),
            bytes = writer.current_offset(),
            "store opened"
        );

        Ok(Self {
            name: files.name().to_string(),
            files,
            sync_writes,
            writer: Mutex::new(Some(writer)),
            state: RwLock::new(StoreState {
                documents,
                tombstones,
                indexes,
                closed: false,
            }),
        })
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// A consistent read view.
    ///
    /// Writers wait while a snapshot is held; keep it short. While holding
    /// one, do not write to this store, and do not call into a
    /// `DatabaseHandleRegistry` either: acquiring with default indexes
    /// writes to the store under the registry lock, so both sides would
    /// wait on each other.
    pub fn snapshot(&self) -> StorageResult<Snapshot<'_>> {
        let state = self.state.read();
        if state.closed {
            return Err(StorageError::store_closed(&self.name));
        }
        Ok(Snapshot { state })
    }

    /// Current revision of a document, or `None` if absent.
    pub fn get(&self, id: &str) -> StorageResult<Option<Document>> {
        Ok(self.snapshot()?.get(id).cloned())
    }

    /// Whether a document exists
    pub fn contains(&self, id: &str) -> StorageResult<bool> {
        Ok(self.snapshot()?.get(id).is_some())
    }

    /// Number of documents
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.snapshot()?.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.snapshot()?.is_empty())
    }

    /// All ids, ascending
    pub fn ids(&self) -> StorageResult<Vec<String>> {
        Ok(self.snapshot()?.ids().map(str::to_string).collect())
    }

    /// Every document, ascending by id
    pub fn all(&self) -> StorageResult<Vec<Document>> {
        Ok(self.snapshot()?.documents().cloned().collect())
    }

    /// Inserts or updates a document.
    ///
    /// If `doc` carries a revision, it must equal the stored one (a
    /// revision for an absent document never matches); otherwise the write
    /// is unconditional. Indexes reflect the write before this returns.
    pub fn put(&self, doc: Document) -> Result<Revision> {
        let mut revisions = self.put_all(vec![doc])?;
        revisions
            .pop()
            .ok_or_else(|| Error::InvalidDocument("empty write".to_string()))
    }

    /// Writes several documents as one unit.
    ///
    /// All revision checks pass or nothing is written. Readers observe
    /// either none or all of the batch.
    pub fn put_all(&self, docs: Vec<Document>) -> Result<Vec<Revision>> {
        validate_batch(&docs)?;

        let mut writer_guard = self.writer.lock();
        let writer = writer_guard
            .as_mut()
            .ok_or_else(|| StorageError::store_closed(&self.name))?;

        let mut records = Vec::with_capacity(docs.len());
        {
            let state = self.state.read();
            for doc in &docs {
                let current = state.documents.get(doc.id()).and_then(Document::revision);
                if let Some(expected) = doc.revision() {
                    if Some(expected) != current {
                        return Err(ConflictError::Conflict {
                            id: doc.id().to_string(),
                            expected,
                            actual: current,
                        }
                        .into());
                    }
                }

                let last_generation = current
                    .map(|r| r.generation())
                    .or_else(|| state.tombstones.get(doc.id()).copied())
                    .unwrap_or(0);
                let body = serde_json::to_vec(doc.body())
                    .map_err(|e| Error::InvalidDocument(e.to_string()))?;
                records.push(DocumentRecord::live(doc.id(), last_generation + 1, body));
            }
        }

        let batch_start = writer.current_offset();
        for record in &records {
            if let Err(e) = writer.append(record) {
                if writer.current_offset() != batch_start {
                    if let Err(undo) = writer.truncate_to(batch_start) {
                        warn!(database = %self.name, error = %undo, "failed to discard partial batch");
                    }
                }
                return Err(e.into());
            }
        }

        let mut state = self.state.write();
        let StoreState {
            documents,
            tombstones,
            indexes,
            ..
        } = &mut *state;

        let mut revisions = Vec::with_capacity(docs.len());
        for (mut doc, record) in docs.into_iter().zip(&records) {
            let revision = Revision::new(record.generation, record.digest);
            doc.set_revision(revision);

            let id = record.document_id.as_str();
            let before = documents.insert(id.to_string(), doc);
            tombstones.remove(id);
            indexes.on_document_changed(id, before.as_ref(), documents.get(id));

            debug!(database = %self.name, document = %id, revision = %revision, "document written");
            revisions.push(revision);
        }

        Ok(revisions)
    }

    /// Removes a document.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut writer_guard = self.writer.lock();
        let writer = writer_guard
            .as_mut()
            .ok_or_else(|| StorageError::store_closed(&self.name))?;

        let generation = {
            let state = self.state.read();
            match state.documents.get(id).and_then(Document::revision) {
                Some(rev) => rev.generation() + 1,
                None => return Err(Error::DocumentNotFound(id.to_string())),
            }
        };

        writer.append(&DocumentRecord::tombstone(id, generation))?;

        let mut state = self.state.write();
        let StoreState {
            documents,
            tombstones,
            indexes,
            ..
        } = &mut *state;
        let before = documents.remove(id);
        tombstones.insert(id.to_string(), generation);
        indexes.on_document_changed(id, before.as_ref(), None);

        debug!(database = %self.name, document = %id, "document deleted");
        Ok(())
    }

    /// Declares an index and builds it over the current documents.
    ///
    /// Returns `Ok(false)` when an identical index already exists.
    pub fn create_index(&self, descriptor: IndexDescriptor) -> Result<bool> {
        descriptor.validate()?;

        let writer_guard = self.writer.lock();
        if writer_guard.is_none() {
            return Err(StorageError::store_closed(&self.name).into());
        }

        let mut state = self.state.write();
        let StoreState {
            documents, indexes, ..
        } = &mut *state;

        match indexes.descriptor(&descriptor.name) {
            Some(existing) if *existing == descriptor => return Ok(false),
            Some(_) => return Err(IndexError::DuplicateName(descriptor.name).into()),
            None => {}
        }

        let mut declared = indexes.descriptors();
        declared.push(descriptor.clone());
        save_descriptors(&self.files.index_path(), &declared)?;

        indexes.create_index(descriptor, documents.values())?;
        Ok(true)
    }

    /// Removes an index and its declaration.
    pub fn drop_index(&self, name: &str) -> Result<IndexDescriptor> {
        let writer_guard = self.writer.lock();
        if writer_guard.is_none() {
            return Err(StorageError::store_closed(&self.name).into());
        }

        let mut state = self.state.write();
        if state.indexes.descriptor(name).is_none() {
            return Err(IndexError::NotFound(name.to_string()).into());
        }

        let remaining: Vec<IndexDescriptor> = state
            .indexes
            .descriptors()
            .into_iter()
            .filter(|d| d.name != name)
            .collect();
        save_descriptors(&self.files.index_path(), &remaining)?;

        Ok(state.indexes.drop_index(name)?)
    }

    /// Declared indexes, sorted by name
    pub fn list_indexes(&self) -> StorageResult<Vec<IndexDescriptor>> {
        Ok(self.snapshot()?.indexes())
    }

    /// Evaluates a predicate against a named index and returns the matching
    /// documents from one consistent view.
    pub fn query(&self, index_name: &str, predicate: impl Into<Predicate>) -> Result<QueryResults> {
        self.snapshot()?.query(index_name, &predicate.into())
    }

    /// Rewrites the data file with only the live documents.
    ///
    /// The latest record of each live document is copied byte for byte, so
    /// bodies and revisions are exactly as before. Superseded revisions and
    /// tombstones are dropped. Returns the number of bytes reclaimed.
    pub fn compact(&self) -> Result<u64> {
        let mut writer_guard = self.writer.lock();
        let before = match writer_guard.as_ref() {
            Some(writer) => writer.current_offset(),
            None => return Err(StorageError::store_closed(&self.name).into()),
        };

        let data_path = self.files.data_path();
        let mut live: BTreeMap<String, DocumentRecord> = BTreeMap::new();
        let mut reader = StorageReader::open(&data_path)?;
        while let Some(record) = reader.read_next()? {
            if record.is_tombstone {
                live.remove(&record.document_id);
            } else {
                live.insert(record.document_id.clone(), record);
            }
        }

        let expected = self.state.read().documents.len();
        if live.len() != expected {
            return Err(StorageError::corrupt_file(format!(
                "Data file holds {} live documents, store holds {}",
                live.len(),
                expected
            ))
            .into());
        }

        let writer = StorageWriter::rewrite(&data_path, live.values(), self.sync_writes)?;
        let after = writer.current_offset();
        *writer_guard = Some(writer);

        let reclaimed = before.saturating_sub(after);
        info!(
            database = %self.name,
            documents = live.len(),
            bytes_before = before,
            bytes_after = after,
            "store compacted"
        );
        Ok(reclaimed)
    }

    /// Releases the data file and in-memory state.
    ///
    /// Idempotent. Every later operation fails with `SEEDDB_STORE_CLOSED`.
    pub fn close(&self) {
        let mut writer_guard = self.writer.lock();
        if writer_guard.take().is_none() {
            return;
        }

        let mut state = self.state.write();
        state.closed = true;
        state.documents.clear();
        state.tombstones.clear();
        state.indexes = IndexManager::new();

        info!(database = %self.name, "store closed");
    }
}

/// A consistent, read-only view of a store
pub struct Snapshot<'a> {
    state: RwLockReadGuard<'a, StoreState>,
}

impl Snapshot<'_> {
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.state.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.state.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.documents.is_empty()
    }

    /// Ids, ascending
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.state.documents.keys().map(String::as_str)
    }

    /// Documents, ascending by id
    pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
        self.state.documents.values()
    }

    /// Declared indexes, sorted by name
    pub fn indexes(&self) -> Vec<IndexDescriptor> {
        self.state.indexes.descriptors()
    }

    /// Evaluates a predicate against a named index.
    pub fn query(&self, index_name: &str, predicate: &Predicate) -> Result<QueryResults> {
        let hits = self.state.indexes.query(index_name, predicate)?;
        Ok(hits
            .into_iter()
            .filter_map(|(id, score)| {
                self.state.documents.get(&id).map(|doc| QueryHit {
                    document: doc.clone(),
                    score,
                })
            })
            .collect())
    }
}

fn validate_batch(docs: &[Document]) -> Result<()> {
    let mut seen = HashSet::new();
    for doc in docs {
        if doc.id().is_empty() {
            return Err(Error::InvalidDocument("document id is empty".to_string()));
        }
        if !seen.insert(doc.id()) {
            return Err(Error::InvalidDocument(format!(
                "document {} appears twice in one batch",
                doc.id()
            )));
        }
    }
    Ok(())
}

fn load_descriptors(path: &Path) -> StorageResult<Vec<IndexDescriptor>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StorageError::io_failure(
                format!("Failed to read index declarations: {}", path.display()),
                e,
            ))
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        StorageError::corrupt_file(format!("Invalid index declarations: {}", e))
            .with_details(format!("path: {}", path.display()))
    })
}

fn save_descriptors(path: &Path, descriptors: &[IndexDescriptor]) -> StorageResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)
        .map_err(|e| StorageError::io_failure("Failed to stage index declarations", e))?;

    serde_json::to_writer_pretty(&mut staged, descriptors)
        .map_err(|e| StorageError::io_failure("Failed to encode index declarations", e.into()))?;
    staged
        .flush()
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| StorageError::io_failure("Failed to write index declarations", e))?;

    staged
        .persist(path)
        .map_err(|e| StorageError::io_failure("Failed to replace index declarations", e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageErrorCode, StorageFile};
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> DocumentStore {
        let files = StorageFile::new(temp.path());
        if !files.exists("test") {
            files.create("test").unwrap();
        }
        DocumentStore::open_with(files.open("test").unwrap(), false).unwrap()
    }

    fn doc(id: &str, body: Value) -> Document {
        Document::from_json(id, body).unwrap()
    }

    #[test]
    fn test_put_assigns_increasing_revisions() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let r1 = store.put(doc("a", json!({"n": 1}))).unwrap();
        let r2 = store.put(doc("a", json!({"n": 2}))).unwrap();
        assert_eq!(r1.generation(), 1);
        assert_eq!(r2.generation(), 2);
        assert_eq!(store.get("a").unwrap().unwrap().revision(), Some(r2));
    }

    #[test]
    fn test_stale_revision_conflicts() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let r1 = store.put(doc("a", json!({"n": 1}))).unwrap();
        store
            .put(doc("a", json!({"n": 2})).with_revision(r1))
            .unwrap();

        let err = store
            .put(doc("a", json!({"n": 3})).with_revision(r1))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.get("a").unwrap().unwrap().get("n"), Some(&json!(2)));
    }

    #[test]
    fn test_revision_for_absent_document_conflicts() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let err = store
            .put(doc("ghost", json!({})).with_revision(Revision::new(1, 0)))
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store.get("ghost").unwrap().is_none());
    }

    #[test]
    fn test_generation_survives_delete_and_recreate() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.put(doc("a", json!({}))).unwrap();
        store.delete("a").unwrap();
        let rev = store.put(doc("a", json!({}))).unwrap();
        assert_eq!(rev.generation(), 3);
    }

    #[test]
    fn test_delete_missing() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        assert!(matches!(
            store.delete("nope"),
            Err(Error::DocumentNotFound(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_empty_id_and_duplicate_batch_rejected() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        assert!(matches!(
            store.put(doc("", json!({}))),
            Err(Error::InvalidDocument(_))
        ));
        assert!(matches!(
            store.put_all(vec![doc("a", json!({})), doc("a", json!({}))]),
            Err(Error::InvalidDocument(_))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_batch_conflict_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        store.put(doc("a", json!({}))).unwrap();

        let result = store.put_all(vec![
            doc("b", json!({})),
            doc("a", json!({})).with_revision(Revision::new(9, 9)),
        ]);
        assert!(result.unwrap_err().is_conflict());
        assert!(!store.contains("b").unwrap());
    }

    #[test]
    fn test_reopen_restores_documents_and_indexes() {
        let temp = TempDir::new().unwrap();
        {
            let store = open_store(&temp);
            store
                .create_index(IndexDescriptor::full_text("fts", ["description"]))
                .unwrap();
            store
                .put(doc("hotel1", json!({"description": "Ocean view suite"})))
                .unwrap();
            store
                .put(doc("hotel2", json!({"description": "Ocean breeze"})))
                .unwrap();
            store.delete("hotel2").unwrap();
            store.close();
        }

        let store = open_store(&temp);
        assert_eq!(store.ids().unwrap(), vec!["hotel1"]);
        assert_eq!(store.list_indexes().unwrap().len(), 1);
        assert_eq!(store.query("fts", "ocean").unwrap().ids(), vec!["hotel1"]);
    }

    #[test]
    fn test_closed_store_rejects_everything() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        store.put(doc("a", json!({}))).unwrap();
        store.close();
        store.close();

        assert!(store.is_closed());
        assert_eq!(
            store.get("a").unwrap_err().code(),
            StorageErrorCode::StoreClosed
        );
        assert_eq!(
            store.put(doc("b", json!({}))).unwrap_err().storage_code(),
            Some(StorageErrorCode::StoreClosed)
        );
        assert_eq!(
            store.delete("a").unwrap_err().storage_code(),
            Some(StorageErrorCode::StoreClosed)
        );
        assert_eq!(
            store
                .create_index(IndexDescriptor::value("v", ["x"]))
                .unwrap_err()
                .storage_code(),
            Some(StorageErrorCode::StoreClosed)
        );
        assert!(store.query("v", Predicate::equals(1)).is_err());
    }

    #[test]
    fn test_drop_index_forgets_declaration() {
        let temp = TempDir::new().unwrap();
        {
            let store = open_store(&temp);
            store
                .create_index(IndexDescriptor::value("byCity", ["city"]))
                .unwrap();
            store.drop_index("byCity").unwrap();
            assert!(matches!(
                store.drop_index("byCity"),
                Err(Error::Index(IndexError::NotFound(_)))
            ));
        }
        let store = open_store(&temp);
        assert!(store.list_indexes().unwrap().is_empty());
    }

    #[test]
    fn test_compact_keeps_live_documents() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        for n in 0..20 {
            store.put(doc("a", json!({ "n": n }))).unwrap();
        }
        store.put(doc("b", json!({}))).unwrap();
        store.delete("b").unwrap();
        let rev = store.get("a").unwrap().unwrap().revision();

        let reclaimed = store.compact().unwrap();
        assert!(reclaimed > 0);
        store.put(doc("c", json!({}))).unwrap();
        store.close();

        let reopened = open_store(&temp);
        assert_eq!(reopened.ids().unwrap(), vec!["a", "c"]);
        assert_eq!(reopened.get("a").unwrap().unwrap().revision(), rev);
    }

    #[test]
    fn test_torn_append_is_discarded() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        store.put(doc("a", json!({"n": 1}))).unwrap();

        store.writer.lock().as_mut().unwrap().tear_append(0, 12);
        let big = "x".repeat(4096);
        let err = store.put(doc("b", json!({ "pad": big }))).unwrap_err();
        assert_eq!(err.storage_code(), Some(StorageErrorCode::IoFailure));
        assert!(!store.contains("b").unwrap());

        let rev_c = store.put(doc("c", json!({}))).unwrap();
        store.close();

        let reopened = open_store(&temp);
        assert_eq!(reopened.ids().unwrap(), vec!["a", "c"]);
        assert_eq!(reopened.get("c").unwrap().unwrap().revision(), Some(rev_c));
    }

    #[test]
    fn test_failed_batch_leaves_no_prefix() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        store.put(doc("a", json!({}))).unwrap();

        // b1 lands whole, b2 is torn after 5 bytes
        store.writer.lock().as_mut().unwrap().tear_append(1, 5);
        let result = store.put_all(vec![doc("b1", json!({})), doc("b2", json!({}))]);
        assert_eq!(
            result.unwrap_err().storage_code(),
            Some(StorageErrorCode::IoFailure)
        );
        assert!(!store.contains("b1").unwrap());

        store.put(doc("c", json!({}))).unwrap();
        store.close();

        let reopened = open_store(&temp);
        assert_eq!(reopened.ids().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_compaction_keeps_stored_bytes_and_revisions() {
        let temp = TempDir::new().unwrap();
        let files = StorageFile::new(temp.path());
        files.create("seeded").unwrap();
        let handle = files.open("seeded").unwrap();
        {
            let mut writer = StorageWriter::open(&handle.data_path(), false).unwrap();
            writer
                .append(&DocumentRecord::live(
                    "hotel1",
                    1,
                    br#"{ "name" : "Sea",  "city":"Nice" }"#.to_vec(),
                ))
                .unwrap();
        }

        let store = DocumentStore::open_with(handle.clone(), false).unwrap();
        let seeded = store.get("hotel1").unwrap().unwrap().revision().unwrap();
        store.put(doc("other", json!({}))).unwrap();
        store.delete("other").unwrap();
        store.compact().unwrap();
        assert_eq!(store.get("hotel1").unwrap().unwrap().revision(), Some(seeded));
        store.close();

        let store = DocumentStore::open_with(handle, false).unwrap();
        assert_eq!(store.get("hotel1").unwrap().unwrap().revision(), Some(seeded));
        store
            .put(doc("hotel1", json!({"name": "Sea"})).with_revision(seeded))
            .unwrap();
    }

    #[test]
    fn test_corrupt_body_reported_on_open() {
        let temp = TempDir::new().unwrap();
        let files = StorageFile::new(temp.path());
        files.create("bad").unwrap();
        let handle = files.open("bad").unwrap();
        {
            let mut writer = StorageWriter::open(&handle.data_path(), false).unwrap();
            writer
                .append(&DocumentRecord::live("x", 1, b"not json".to_vec()))
                .unwrap();
        }

        let err = DocumentStore::open(handle).err().unwrap();
        assert_eq!(err.code(), StorageErrorCode::CorruptFile);
    }

    #[test]
    fn test_corrupt_index_declarations_reported_on_open() {
        let temp = TempDir::new().unwrap();
        let files = StorageFile::new(temp.path());
        files.create("bad").unwrap();
        let handle = files.open("bad").unwrap();
        std::fs::write(handle.index_path(), b"{ nope").unwrap();

        let err = DocumentStore::open(handle).err().unwrap();
        assert_eq!(err.code(), StorageErrorCode::CorruptFile);
    }
}
