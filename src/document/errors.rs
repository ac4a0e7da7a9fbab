//! Optimistic concurrency errors

use thiserror::Error;

use super::types::Revision;

/// A conditional write lost the race.
///
/// Recoverable: re-read the document, reapply the change and retry with
/// the fresh revision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("Revision conflict on '{id}': write based on {expected}, stored revision is {}", describe(.actual))]
    Conflict {
        id: String,
        expected: Revision,
        actual: Option<Revision>,
    },
}

fn describe(revision: &Option<Revision>) -> String {
    match revision {
        Some(rev) => rev.to_string(),
        None => "absent".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_both_revisions() {
        let err = ConflictError::Conflict {
            id: "hotel1".into(),
            expected: Revision::new(1, 0xab),
            actual: Some(Revision::new(2, 0xcd)),
        };
        let text = err.to_string();
        assert!(text.contains("hotel1"));
        assert!(text.contains("1-000000ab"));
        assert!(text.contains("2-000000cd"));
    }

    #[test]
    fn test_display_for_missing_document() {
        let err = ConflictError::Conflict {
            id: "ghost".into(),
            expected: Revision::new(1, 0),
            actual: None,
        };
        assert!(err.to_string().ends_with("absent"));
    }
}
