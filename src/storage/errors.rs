//! Storage error types
//!
//! Error codes:
//! - SEEDDB_SEED_NOT_FOUND
//! - SEEDDB_TARGET_EXISTS
//! - SEEDDB_NOT_FOUND
//! - SEEDDB_IO_FAILURE
//! - SEEDDB_CORRUPT_FILE
//! - SEEDDB_STORE_CLOSED
//! - SEEDDB_INVALID_NAME

use std::fmt;
use std::io;

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorCode {
    /// Bundled seed database is missing
    SeedNotFound,
    /// Copy or create target already exists
    TargetExists,
    /// Database is not present in the storage location
    NotFound,
    /// Underlying filesystem operation failed
    IoFailure,
    /// On-disk layout is invalid
    CorruptFile,
    /// Operation attempted on a closed store
    StoreClosed,
    /// Database name cannot be mapped to a storage path
    InvalidName,
}

impl StorageErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::SeedNotFound => "SEEDDB_SEED_NOT_FOUND",
            StorageErrorCode::TargetExists => "SEEDDB_TARGET_EXISTS",
            StorageErrorCode::NotFound => "SEEDDB_NOT_FOUND",
            StorageErrorCode::IoFailure => "SEEDDB_IO_FAILURE",
            StorageErrorCode::CorruptFile => "SEEDDB_CORRUPT_FILE",
            StorageErrorCode::StoreClosed => "SEEDDB_STORE_CLOSED",
            StorageErrorCode::InvalidName => "SEEDDB_INVALID_NAME",
        }
    }

    /// Whether retrying the same call can succeed without caller intervention.
    ///
    /// Only I/O failures qualify; a seed copy that failed this way left no
    /// partial target behind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageErrorCode::IoFailure)
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    /// Error code
    code: StorageErrorCode,
    /// Human-readable message
    message: String,
    /// Optional details about the error context
    details: Option<String>,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Seed database missing at the given location
    pub fn seed_not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::SeedNotFound, message)
    }

    /// Target database already present
    pub fn target_exists(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::TargetExists, message)
    }

    /// Database not present
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::NotFound, message)
    }

    /// Filesystem failure with the originating IO error
    pub fn io_failure(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(StorageErrorCode::IoFailure, message)
        }
    }

    /// Invalid on-disk layout
    pub fn corrupt_file(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::CorruptFile, message)
    }

    /// Invalid on-disk layout at a known byte offset
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::new(StorageErrorCode::CorruptFile, reason)
        }
    }

    /// Store was closed before the operation
    pub fn store_closed(name: &str) -> Self {
        Self {
            details: Some(format!("database: {}", name)),
            ..Self::new(StorageErrorCode::StoreClosed, "Store is closed")
        }
    }

    /// Database name rejected
    pub fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("database: {:?}", name)),
            ..Self::new(StorageErrorCode::InvalidName, reason)
        }
    }

    /// Attaches detail text to an existing error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Shorthand for `code().is_retryable()`
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
