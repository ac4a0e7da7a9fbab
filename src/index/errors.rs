//! Index error types

use thiserror::Error;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Index errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A different index already uses this name
    #[error("Index name already in use by a different definition: {0}")]
    DuplicateName(String),

    /// No index with this name
    #[error("Index not found: {0}")]
    NotFound(String),

    /// Descriptor cannot describe a usable index
    #[error("Invalid index descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// Predicate does not apply to this kind of index
    #[error("Predicate {predicate} is not supported by {kind} index '{name}'")]
    UnsupportedPredicate {
        name: String,
        kind: &'static str,
        predicate: &'static str,
    },

    /// Value predicate does not supply one value per indexed field
    #[error("Index '{name}' has {expected} field(s) but the predicate supplies {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

impl IndexError {
    /// Create an invalid descriptor error
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "SEEDDB_INDEX_DUPLICATE_NAME",
            Self::NotFound(_) => "SEEDDB_INDEX_NOT_FOUND",
            Self::InvalidDescriptor { .. } => "SEEDDB_INDEX_INVALID",
            Self::UnsupportedPredicate { .. } => "SEEDDB_INDEX_UNSUPPORTED_PREDICATE",
            Self::ArityMismatch { .. } => "SEEDDB_INDEX_ARITY_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_index() {
        let err = IndexError::DuplicateName("descFTSIndex".into());
        assert!(err.to_string().contains("descFTSIndex"));
        assert_eq!(err.code(), "SEEDDB_INDEX_DUPLICATE_NAME");
    }

    #[test]
    fn test_unsupported_predicate_display() {
        let err = IndexError::UnsupportedPredicate {
            name: "byCity".into(),
            kind: "value",
            predicate: "match",
        };
        assert_eq!(
            err.to_string(),
            "Predicate match is not supported by value index 'byCity'"
        );
    }
}
