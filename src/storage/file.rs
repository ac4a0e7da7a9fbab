//! On-disk location of named databases
//!
//! A database called `name` lives in `<root>/<name>.seeddb/`, holding the
//! record file `documents.dat` and the index declarations `indexes.json`.
//!
//! Seeding copies a bundled, read-only database into the storage root.
//! The copy is staged in a temporary directory inside the root and renamed
//! into place, so a failed copy never leaves a partial database behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::errors::{StorageError, StorageResult};
use super::writer::StorageWriter;

/// Fixed extension of database directories
pub const DATABASE_EXTENSION: &str = "seeddb";

/// Record file inside a database directory
pub const DATA_FILE: &str = "documents.dat";

/// Index declarations inside a database directory
pub const INDEX_FILE: &str = "indexes.json";

/// Paths of one existing database, produced by [`StorageFile::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    name: String,
    dir: PathBuf,
}

impl FileHandle {
    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `documents.dat`
    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    /// Path of `indexes.json`
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }
}

/// Maps database names to directories under one storage root.
#[derive(Debug, Clone)]
pub struct StorageFile {
    root: PathBuf,
}

impl StorageFile {
    /// Binds to a storage root. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory a database name maps to.
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}.{}", name, DATABASE_EXTENSION)))
    }

    /// Whether a database called `name` exists under the root.
    ///
    /// Names that cannot map to a path never exist.
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Copies a bundled seed database into the root under `name`.
    ///
    /// `seed_path` is either a database directory or a bare `documents.dat`.
    /// This call never overwrites: an existing target is `SEEDDB_TARGET_EXISTS`,
    /// and callers check [`exists`](Self::exists) first. After an
    /// `SEEDDB_IO_FAILURE` nothing is left at the target and the call can be
    /// retried.
    pub fn copy_seed(&self, seed_path: &Path, name: &str) -> StorageResult<()> {
        let target = self.path_for(name)?;

        let seed_meta = fs::metadata(seed_path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::seed_not_found(format!("Seed not found: {}", seed_path.display()))
            } else {
                StorageError::io_failure(
                    format!("Failed to inspect seed: {}", seed_path.display()),
                    e,
                )
            }
        })?;

        if seed_meta.is_dir() && !seed_path.join(DATA_FILE).is_file() {
            return Err(StorageError::seed_not_found(format!(
                "Seed directory has no {}: {}",
                DATA_FILE,
                seed_path.display()
            )));
        }

        if target.exists() {
            return Err(StorageError::target_exists(format!(
                "Database already exists: {}",
                target.display()
            )));
        }

        self.ensure_root()?;

        let staged = tempfile::Builder::new()
            .prefix(".seed-")
            .tempdir_in(&self.root)
            .map_err(|e| StorageError::io_failure("Failed to create staging directory", e))?;

        let copied = if seed_meta.is_dir() {
            copy_dir_recursive(seed_path, staged.path())
        } else {
            fs::copy(seed_path, staged.path().join(DATA_FILE)).map(|_| ())
        };
        copied.map_err(|e| {
            StorageError::io_failure(format!("Failed to copy seed: {}", seed_path.display()), e)
        })?;

        // Re-checked because another process may have won the race since.
        if target.exists() {
            return Err(StorageError::target_exists(format!(
                "Database already exists: {}",
                target.display()
            )));
        }

        fs::rename(staged.path(), &target).map_err(|e| {
            StorageError::io_failure(
                format!("Failed to move seed into place: {}", target.display()),
                e,
            )
        })?;

        info!(
            database = name,
            seed = %seed_path.display(),
            target = %target.display(),
            "seed database copied"
        );
        Ok(())
    }

    /// Creates an empty database under `name`.
    pub fn create(&self, name: &str) -> StorageResult<()> {
        let target = self.path_for(name)?;
        if target.exists() {
            return Err(StorageError::target_exists(format!(
                "Database already exists: {}",
                target.display()
            )));
        }

        self.ensure_root()?;

        let staged = tempfile::Builder::new()
            .prefix(".create-")
            .tempdir_in(&self.root)
            .map_err(|e| StorageError::io_failure("Failed to create staging directory", e))?;
        StorageWriter::create(&staged.path().join(DATA_FILE), true)?;

        fs::rename(staged.path(), &target).map_err(|e| {
            StorageError::io_failure(
                format!("Failed to move database into place: {}", target.display()),
                e,
            )
        })?;

        info!(database = name, path = %target.display(), "empty database created");
        Ok(())
    }

    /// Opens an existing database.
    pub fn open(&self, name: &str) -> StorageResult<FileHandle> {
        let dir = self.path_for(name)?;
        if !dir.is_dir() {
            return Err(StorageError::not_found(format!(
                "Database not found: {}",
                dir.display()
            )));
        }
        if !dir.join(DATA_FILE).is_file() {
            return Err(StorageError::not_found(format!(
                "Database has no {}: {}",
                DATA_FILE,
                dir.display()
            )));
        }

        debug!(database = name, path = %dir.display(), "database files located");
        Ok(FileHandle {
            name: name.to_string(),
            dir,
        })
    }

    /// Removes a database directory and everything in it.
    pub fn delete(&self, name: &str) -> StorageResult<()> {
        let dir = self.path_for(name)?;
        fs::remove_dir_all(&dir).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::not_found(format!("Database not found: {}", dir.display()))
            } else {
                StorageError::io_failure(
                    format!("Failed to delete database: {}", dir.display()),
                    e,
                )
            }
        })?;

        info!(database = name, path = %dir.display(), "database deleted");
        Ok(())
    }

    fn ensure_root(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            StorageError::io_failure(
                format!("Failed to create storage root: {}", self.root.display()),
                e,
            )
        })
    }
}

fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() {
        return Err(StorageError::invalid_name(name, "Database name is empty"));
    }
    if name.starts_with('.') {
        return Err(StorageError::invalid_name(
            name,
            "Database name cannot start with '.'",
        ));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(StorageError::invalid_name(
            name,
            "Database name cannot contain path separators",
        ));
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
