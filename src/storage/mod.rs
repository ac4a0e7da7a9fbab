//! On-disk storage for seeddb
//!
//! Each database is a directory holding an append-only record file.
//!
//! # Design Principles
//!
//! - Append-only (no in-place updates)
//! - Checksum-verified on every read
//! - Latest record wins for the same document id
//! - Seeding and compaction stage in a temporary path and rename into place
//!
//! # Invariants
//!
//! - A seed copy never overwrites an existing database
//! - A failed seed copy leaves no partial database behind
//! - Any invalid byte in `documents.dat` is reported as `SEEDDB_CORRUPT_FILE`

mod checksum;
mod errors;
mod file;
mod reader;
mod record;
mod writer;

pub use checksum::compute_checksum;
pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use file::{FileHandle, StorageFile, DATABASE_EXTENSION, DATA_FILE, INDEX_FILE};
pub use reader::StorageReader;
pub use record::{DocumentRecord, FILE_MAGIC};
pub use writer::StorageWriter;
