//! Crate-level error type
//!
//! Every public operation returns these explicitly; nothing is only logged
//! and nothing aborts the host process.

use thiserror::Error;

use crate::document::ConflictError;
use crate::index::IndexError;
use crate::storage::{StorageError, StorageErrorCode};

/// Result type for seeddb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure of a seeddb operation
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem, layout or lifecycle failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Conditional write based on a stale revision
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Index declaration or lookup failure
    #[error(transparent)]
    Index(#[from] IndexError),

    /// No document with this id
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Document cannot be stored as given
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl Error {
    /// Whether this is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Storage error code, if this is a storage error
    pub fn storage_code(&self) -> Option<StorageErrorCode> {
        match self {
            Error::Storage(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Stable string code for any variant
    pub fn code(&self) -> &'static str {
        match self {
            Error::Storage(e) => e.code().code(),
            Error::Conflict(_) => "SEEDDB_CONFLICT",
            Error::Index(e) => e.code(),
            Error::DocumentNotFound(_) => "SEEDDB_DOCUMENT_NOT_FOUND",
            Error::InvalidDocument(_) => "SEEDDB_INVALID_DOCUMENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        let err: Error = StorageError::store_closed("db").into();
        assert_eq!(err.code(), "SEEDDB_STORE_CLOSED");
        assert_eq!(err.storage_code(), Some(StorageErrorCode::StoreClosed));

        let err: Error = IndexError::NotFound("x".into()).into();
        assert_eq!(err.code(), "SEEDDB_INDEX_NOT_FOUND");
        assert_eq!(err.storage_code(), None);
    }

    #[test]
    fn test_transparent_display() {
        let err: Error = IndexError::NotFound("descFTSIndex".into()).into();
        assert_eq!(err.to_string(), "Index not found: descFTSIndex");
    }
}
