//! Full-text search: analysis and the inverted index

mod analyzer;
mod inverted;

pub use analyzer::{Analyzer, QueryTerm, Token, MAX_TOKEN_LEN};
pub use inverted::{FullTextIndex, FullTextMatches, Occurrence, Postings};
