//! Query predicates
//!
//! Value indexes answer `Eq` and `Range`; full-text indexes answer `Match`
//! and `Phrase`. Multi-field value indexes take one value per field, and
//! range bounds compare lexicographically over the composite key.

use serde_json::Value;

/// A filter evaluated against one named index
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Composite key equals these values
    Eq(Vec<Value>),
    /// Composite key within `[min, max]`; `None` leaves that side open
    Range {
        min: Option<Vec<Value>>,
        max: Option<Vec<Value>>,
    },
    /// Every token of the text occurs; `word*` matches by prefix
    Match(String),
    /// Tokens occur consecutively within one field
    Phrase(String),
}

impl Predicate {
    /// Single-field equality
    pub fn equals(value: impl Into<Value>) -> Self {
        Predicate::Eq(vec![value.into()])
    }

    /// Single-field inclusive range
    pub fn between(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Predicate::Range {
            min: Some(vec![min.into()]),
            max: Some(vec![max.into()]),
        }
    }

    /// Single-field lower bound
    pub fn at_least(min: impl Into<Value>) -> Self {
        Predicate::Range {
            min: Some(vec![min.into()]),
            max: None,
        }
    }

    /// Single-field upper bound
    pub fn at_most(max: impl Into<Value>) -> Self {
        Predicate::Range {
            min: None,
            max: Some(vec![max.into()]),
        }
    }

    /// Full-text token match
    pub fn matches(text: impl Into<String>) -> Self {
        Predicate::Match(text.into())
    }

    /// Full-text phrase match
    pub fn phrase(text: impl Into<String>) -> Self {
        Predicate::Phrase(text.into())
    }

    /// Short name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::Eq(_) => "eq",
            Predicate::Range { .. } => "range",
            Predicate::Match(_) => "match",
            Predicate::Phrase(_) => "phrase",
        }
    }
}

/// A bare string is a full-text match.
impl From<&str> for Predicate {
    fn from(text: &str) -> Self {
        Predicate::Match(text.to_string())
    }
}

impl From<String> for Predicate {
    fn from(text: String) -> Self {
        Predicate::Match(text)
    }
}
