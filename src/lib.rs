//! seeddb - An embedded document store with seed-on-first-use
//!
//! Databases are opened through a [`DatabaseHandleRegistry`], which copies a
//! bundled seed into the storage root the first time a name is used and
//! shares one open store among all handles for that name.
//!
//! Each store keeps its documents in an append-only checksummed file and
//! maintains declared value and full-text indexes synchronously with every
//! write.

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod metrics;
pub mod registry;
pub mod storage;

pub use config::{ConfigError, DatabaseConfig};
pub use document::{ConflictError, Document, DocumentStore, QueryHit, QueryResults, Revision};
pub use error::{Error, Result};
pub use index::{IndexDescriptor, IndexError, IndexKind, Predicate};
pub use registry::{AcquireOptions, DatabaseHandleRegistry, Handle};
pub use storage::{StorageError, StorageErrorCode, StorageFile};
