use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::handle::Handle;
use crate::config::DatabaseConfig;
use crate::document::DocumentStore;
use crate::error::Result;
use crate::index::IndexDescriptor;
use crate::metrics::RegistryMetrics;
use crate::storage::StorageFile;

/// How to materialize and prepare a database on acquire
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// Seed copied in when the database does not exist yet; an empty
    /// database is created when `None`
    pub seed_path: Option<PathBuf>,
    /// Indexes declared on every acquire; identical re-declarations are
    /// no-ops
    pub indexes: Vec<IndexDescriptor>,
}

impl AcquireOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(mut self, seed_path: impl Into<PathBuf>) -> Self {
        self.seed_path = Some(seed_path.into());
        self
    }

    pub fn index(mut self, descriptor: IndexDescriptor) -> Self {
        self.indexes.push(descriptor);
        self
    }
}

struct Entry {
    store: Arc<DocumentStore>,
    ref_count: usize,
}

pub(super) struct RegistryInner {
    config: DatabaseConfig,
    files: StorageFile,
    entries: Mutex<HashMap<String, Entry>>,
    metrics: RegistryMetrics,
}

impl RegistryInner {
    /// Drops one reference to `store`; the last one closes it.
    pub(super) fn release(&self, name: &str, store: &Arc<DocumentStore>) {
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get_mut(name) else {
            return;
        };
        if !Arc::ptr_eq(&entry.store, store) {
            return;
        }

        entry.ref_count -= 1;
        debug!(database = name, ref_count = entry.ref_count, "handle released");

        if entry.ref_count == 0 {
            if let Some(entry) = entries.remove(name) {
                entry.store.close();
                self.metrics.increment_store_closes();
                info!(database = name, "database released");
            }
        }
    }
}

/// Process-wide owner of open databases.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct DatabaseHandleRegistry {
    inner: Arc<RegistryInner>,
}

impl DatabaseHandleRegistry {
    pub fn new(config: DatabaseConfig) -> Self {
        let files = StorageFile::new(config.storage_dir.clone());
        Self {
            inner: Arc::new(RegistryInner {
                config,
                files,
                entries: Mutex::new(HashMap::new()),
                metrics: RegistryMetrics::new(),
            }),
        }
    }

    /// Returns a handle to `name`, copying `seed_path` in if the database
    /// does not exist yet.
    pub fn acquire(&self, name: &str, seed_path: impl AsRef<Path>) -> Result<Handle> {
        self.acquire_with(name, AcquireOptions::new().seed(seed_path.as_ref()))
    }

    /// Returns a handle to `name`.
    ///
    /// The first acquire materializes the database if needed and opens it.
    /// Later acquires share the open store. `options.indexes` are declared
    /// either way; if that fails, no reference is taken.
    ///
    /// Declaring indexes writes to the store while the registry lock is
    /// held, so never pass indexes while holding a `Snapshot` of that
    /// store.
    pub fn acquire_with(&self, name: &str, options: AcquireOptions) -> Result<Handle> {
        let inner = &self.inner;
        let mut entries = inner.entries.lock();

        if let Some(entry) = entries.get_mut(name) {
            for descriptor in &options.indexes {
                entry.store.create_index(descriptor.clone())?;
            }
            entry.ref_count += 1;
            debug!(database = name, ref_count = entry.ref_count, "handle acquired");
            return Ok(self.handle(name, Arc::clone(&entry.store)));
        }

        self.materialize(name, options.seed_path.as_deref())?;

        let files = inner.files.open(name)?;
        let store = DocumentStore::open_with(files, inner.config.sync_writes)?;
        inner.metrics.increment_store_opens();

        for descriptor in &options.indexes {
            if let Err(e) = store.create_index(descriptor.clone()) {
                warn!(database = name, index = %descriptor.name, error = %e, "default index rejected");
                store.close();
                inner.metrics.increment_store_closes();
                return Err(e);
            }
        }

        let store = Arc::new(store);
        entries.insert(
            name.to_string(),
            Entry {
                store: Arc::clone(&store),
                ref_count: 1,
            },
        );
        info!(database = name, "database opened");
        Ok(self.handle(name, store))
    }

    /// Gives a handle back. Same as dropping it.
    pub fn release(&self, handle: Handle) {
        drop(handle);
    }

    /// Live handles for `name`; zero when not open
    pub fn ref_count(&self, name: &str) -> usize {
        self.inner
            .entries
            .lock()
            .get(name)
            .map_or(0, |entry| entry.ref_count)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.inner.entries.lock().contains_key(name)
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.inner.metrics
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// File layout under the configured storage root
    pub fn storage(&self) -> &StorageFile {
        &self.inner.files
    }

    fn materialize(&self, name: &str, seed_path: Option<&Path>) -> Result<()> {
        let inner = &self.inner;
        if inner.files.exists(name) {
            return Ok(());
        }

        match seed_path {
            Some(seed) => {
                inner.files.copy_seed(seed, name)?;
                inner.metrics.increment_seed_copies();
            }
            None => {
                inner.files.create(name)?;
                inner.metrics.increment_creates();
            }
        }
        Ok(())
    }

    fn handle(&self, name: &str, store: Arc<DocumentStore>) -> Handle {
        let registry: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        Handle::new(name.to_string(), store, registry)
    }
}
