//! Sequential reader for `documents.dat`
//!
//! Every record is checksum-verified as it is read. Any framing or
//! checksum failure surfaces as `SEEDDB_CORRUPT_FILE` with the byte offset
//! of the offending record.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::{DocumentRecord, FILE_MAGIC, HEADER_LEN, MIN_RECORD_SIZE};

/// Forward-only reader over the records of one data file.
pub struct StorageReader {
    /// Path to the data file
    path: PathBuf,
    /// Buffered reader positioned after the last consumed record
    reader: BufReader<File>,
    /// Current byte offset
    current_offset: u64,
    /// Total file size at open time
    file_size: u64,
}

impl StorageReader {
    /// Opens a data file and validates its header.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::not_found(format!("Data file not found: {}", path.display()))
            } else {
                StorageError::io_failure(
                    format!("Failed to open data file: {}", path.display()),
                    e,
                )
            }
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| StorageError::io_failure("Failed to read file metadata", e))?
            .len();

        if file_size < HEADER_LEN {
            return Err(StorageError::corrupt_file(format!(
                "Data file too short for header: {} bytes",
                file_size
            ))
            .with_details(format!("path: {}", path.display())));
        }

        let mut reader = BufReader::new(file);
        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|e| StorageError::io_failure("Failed to read data file header", e))?;

        if &magic != FILE_MAGIC {
            return Err(StorageError::corruption_at_offset(0, "Bad file magic"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            current_offset: HEADER_LEN,
            file_size,
        })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the offset of the next record.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next record.
    ///
    /// - `Ok(Some(record))` if a record was read
    /// - `Ok(None)` at end of file
    /// - `Err(SEEDDB_CORRUPT_FILE)` on framing or checksum failure
    pub fn read_next(&mut self) -> StorageResult<Option<DocumentRecord>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_RECORD_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated data file: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE as u64 || record_length > remaining {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Invalid record length {} ({} bytes remaining)",
                    record_length, remaining
                ),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut record_buf[4..]).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read record body: {}", e),
            )
        })?;

        let (record, consumed) = DocumentRecord::deserialize(&record_buf)
            .map_err(|e| StorageError::corruption_at_offset(self.current_offset, e.to_string()))?;

        self.current_offset += consumed as u64;
        Ok(Some(record))
    }

    /// Reads every remaining record.
    pub fn read_all(&mut self) -> StorageResult<Vec<DocumentRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }
}
