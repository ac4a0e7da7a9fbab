//! Append-only writer for `documents.dat`
//!
//! Records are never rewritten in place. A record is acknowledged only after
//! the bytes reach the file and, when `sync` is enabled, after `fsync`.
//!
//! A failed append is truncated away before the error is returned, so the
//! file never ends in an unacknowledged partial record. If that truncation
//! fails too, the writer refuses further appends until the store is
//! reopened.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;

use super::errors::{StorageError, StorageResult};
use super::record::{DocumentRecord, FILE_MAGIC};

/// Appends records to one data file.
pub struct StorageWriter {
    /// Path to the data file
    path: PathBuf,
    /// Underlying file handle opened for append
    file: File,
    /// Offset the next record will be written at
    current_offset: u64,
    /// fsync after each append
    sync: bool,
    /// Set when unacknowledged bytes could not be truncated away
    broken: bool,
    /// Fault injection: (appends to let through, bytes of the torn append)
    #[cfg(test)]
    tear: Option<(usize, usize)>,
}

impl StorageWriter {
    /// Creates a new data file containing only the header.
    ///
    /// Fails with `SEEDDB_TARGET_EXISTS` if the file is already present.
    pub fn create(path: &Path, sync: bool) -> StorageResult<Self> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::target_exists(format!(
                        "Data file already exists: {}",
                        path.display()
                    ))
                } else {
                    StorageError::io_failure(
                        format!("Failed to create data file: {}", path.display()),
                        e,
                    )
                }
            })?;

        file.write_all(FILE_MAGIC)
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::io_failure("Failed to write data file header", e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_offset: FILE_MAGIC.len() as u64,
            sync,
            broken: false,
            #[cfg(test)]
            tear: None,
        })
    }

    /// Opens an existing data file for append.
    ///
    /// The caller is expected to have validated the contents with a
    /// `StorageReader` first.
    pub fn open(path: &Path, sync: bool) -> StorageResult<Self> {
        let file = OpenOptions::new().append(true).open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::not_found(format!("Data file not found: {}", path.display()))
            } else {
                StorageError::io_failure(
                    format!("Failed to open data file: {}", path.display()),
                    e,
                )
            }
        })?;

        let current_offset = file
            .metadata()
            .map_err(|e| StorageError::io_failure("Failed to read file metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_offset,
            sync,
            broken: false,
            #[cfg(test)]
            tear: None,
        })
    }

    /// Returns the path to the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the offset the next record will be written at.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends a record and returns the offset it was written at.
    ///
    /// On failure the file is truncated back to where the record started.
    pub fn append(&mut self, record: &DocumentRecord) -> StorageResult<u64> {
        self.ensure_usable()?;

        let serialized = record.serialize();
        let offset = self.current_offset;

        if let Err(e) = self.write_bytes(&serialized) {
            self.roll_back(offset);
            return Err(StorageError::io_failure(
                format!("Failed to write document: {}", record.document_id),
                e,
            ));
        }

        if self.sync {
            if let Err(e) = self.file.sync_data() {
                self.roll_back(offset);
                return Err(StorageError::io_failure(
                    format!("fsync failed after writing document: {}", record.document_id),
                    e,
                ));
            }
        }

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }

    /// Discards every byte from `offset` on.
    ///
    /// Used to undo appends that were never acknowledged, such as the
    /// written prefix of a failed batch.
    pub fn truncate_to(&mut self, offset: u64) -> StorageResult<()> {
        self.ensure_usable()?;

        let truncated = self.file.set_len(offset).and_then(|_| self.file.sync_data());
        if let Err(e) = truncated {
            self.broken = true;
            return Err(StorageError::io_failure(
                format!("Failed to truncate data file to {} bytes", offset),
                e,
            )
            .with_details(format!("path: {}", self.path.display())));
        }

        self.current_offset = offset;
        Ok(())
    }

    /// Whether appends are still accepted
    pub fn is_usable(&self) -> bool {
        !self.broken
    }

    fn ensure_usable(&self) -> StorageResult<()> {
        if self.broken {
            return Err(StorageError::corrupt_file(
                "Data file ends in an unacknowledged partial record; reopen the store",
            )
            .with_details(format!("path: {}", self.path.display())));
        }
        Ok(())
    }

    fn roll_back(&mut self, offset: u64) {
        if let Err(e) = self.truncate_to(offset) {
            warn!(path = %self.path.display(), offset, error = %e, "rollback of failed append failed");
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if let Some(keep) = self.take_torn_write() {
            self.file.write_all(&bytes[..keep.min(bytes.len())])?;
            return Err(io::Error::new(io::ErrorKind::Other, "injected torn write"));
        }
        self.file.write_all(bytes)
    }

    #[cfg(test)]
    fn take_torn_write(&mut self) -> Option<usize> {
        match self.tear.take() {
            Some((0, keep)) => Some(keep),
            Some((after, keep)) => {
                self.tear = Some((after - 1, keep));
                None
            }
            None => None,
        }
    }

    #[cfg(not(test))]
    fn take_torn_write(&mut self) -> Option<usize> {
        None
    }

    /// Lets `after` appends through, then makes the next one write only
    /// `keep` bytes and fail.
    #[cfg(test)]
    pub(crate) fn tear_append(&mut self, after: usize, keep: usize) {
        self.tear = Some((after, keep));
    }

    /// Replaces the data file with one holding exactly `records`.
    ///
    /// The new file is staged next to the old one and renamed over it, so
    /// a failure at any point leaves the previous file untouched. Returns a
    /// writer positioned at the end of the new file.
    pub fn rewrite<'a, I>(path: &Path, records: I, sync: bool) -> StorageResult<Self>
    where
        I: IntoIterator<Item = &'a DocumentRecord>,
    {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)
            .map_err(|e| StorageError::io_failure("Failed to stage compacted data file", e))?;

        staged
            .write_all(FILE_MAGIC)
            .map_err(|e| StorageError::io_failure("Failed to write data file header", e))?;
        for record in records {
            staged.write_all(&record.serialize()).map_err(|e| {
                StorageError::io_failure(
                    format!("Failed to write document: {}", record.document_id),
                    e,
                )
            })?;
        }
        staged
            .as_file()
            .sync_all()
            .map_err(|e| StorageError::io_failure("fsync failed on compacted data file", e))?;

        staged
            .persist(path)
            .map_err(|e| StorageError::io_failure("Failed to replace data file", e.error))?;

        Self::open(path, sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::reader::StorageReader;
    use tempfile::TempDir;

    #[test]
    fn test_create_refuses_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.dat");
        StorageWriter::create(&path, false).unwrap();

        let err = StorageWriter::create(&path, false).err().unwrap();
        assert_eq!(err.code().code(), "SEEDDB_TARGET_EXISTS");
    }

    #[test]
    fn test_offsets_advance_per_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.dat");
        let mut writer = StorageWriter::create(&path, false).unwrap();

        let first = writer.append(&DocumentRecord::live("a", 1, b"{}".to_vec())).unwrap();
        let second = writer.append(&DocumentRecord::live("b", 1, b"{}".to_vec())).unwrap();

        assert_eq!(first, 8);
        assert!(second > first);
        assert_eq!(writer.current_offset(), std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_reopen_appends_after_existing_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.dat");
        {
            let mut writer = StorageWriter::create(&path, true).unwrap();
            writer.append(&DocumentRecord::live("a", 1, b"{}".to_vec())).unwrap();
        }
        {
            let mut writer = StorageWriter::open(&path, true).unwrap();
            writer.append(&DocumentRecord::live("b", 1, b"{}".to_vec())).unwrap();
        }

        let records = StorageReader::open(&path).unwrap().read_all().unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_failed_append_leaves_no_partial_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.dat");
        let mut writer = StorageWriter::create(&path, false).unwrap();
        writer.append(&DocumentRecord::live("a", 1, b"{}".to_vec())).unwrap();
        let before = writer.current_offset();

        writer.tear_append(0, 10);
        let err = writer
            .append(&DocumentRecord::live("b", 1, vec![b' '; 4096]))
            .unwrap_err();
        assert_eq!(err.code().code(), "SEEDDB_IO_FAILURE");
        assert_eq!(writer.current_offset(), before);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), before);

        writer.append(&DocumentRecord::live("c", 1, b"{}".to_vec())).unwrap();
        let records = StorageReader::open(&path).unwrap().read_all().unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_truncate_discards_acknowledged_tail() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.dat");
        let mut writer = StorageWriter::create(&path, false).unwrap();
        let start = writer.current_offset();
        writer.append(&DocumentRecord::live("a", 1, b"{}".to_vec())).unwrap();

        writer.truncate_to(start).unwrap();
        assert!(writer.is_usable());
        writer.append(&DocumentRecord::live("b", 1, b"{}".to_vec())).unwrap();

        let records = StorageReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document_id, "b");
    }

    #[test]
    fn test_rewrite_replaces_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.dat");
        {
            let mut writer = StorageWriter::create(&path, false).unwrap();
            writer.append(&DocumentRecord::live("a", 1, b"{}".to_vec())).unwrap();
            writer.append(&DocumentRecord::live("a", 2, b"{}".to_vec())).unwrap();
            writer.append(&DocumentRecord::tombstone("b", 2)).unwrap();
        }

        let keep = vec![DocumentRecord::live("a", 2, b"{}".to_vec())];
        let writer = StorageWriter::rewrite(&path, &keep, false).unwrap();

        let records = StorageReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(records, keep);
        assert_eq!(writer.current_offset(), std::fs::metadata(&path).unwrap().len());
    }
}
